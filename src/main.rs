use anyhow::Context;
use clap::Parser;
use prioc::adapters::{
    DocumentCache, FileServerClient, GridHexProvider, ReferenceLoader, UrbanApiClient,
};
use prioc::app::ResultWriter;
use prioc::domain::model::{HexQuery, ObjectType, TerritoryRequest};
use prioc::utils::error::ErrorCategory;
use prioc::utils::{logger, validation::Validate};
use prioc::{AppConfig, CliConfig, Command, LocalStorage, PriocError, PriocService};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting prioc");
    tracing::info!("Loading configuration from: {}", cli.config.display());

    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config file '{}'", cli.config.display()))?;

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    let fileserver = FileServerClient::new(
        &config.fileserver.base_url,
        &config.fileserver.bucket,
        config.fileserver_timeout(),
    )?;
    let cache = DocumentCache::new(&config.cache.path)?;
    let loader = ReferenceLoader::load(
        Arc::new(fileserver),
        cache,
        config.reference_documents(),
        config.fileserver.hexes.clone(),
    )
    .await
    .context("Failed to load reference documents")?;

    if let Command::Refresh { interval } = cli.command {
        return refresh(&loader, interval).await;
    }

    let service = PriocService::new(
        Arc::new(GridHexProvider::new(
            loader.grid(),
            config.supported_territory_id(),
        )),
        Arc::new(UrbanApiClient::new(
            &config.urban_api.base_url,
            config.urban_api_timeout(),
        )?),
        loader.reference(),
        config.clustering(),
    );
    let writer = ResultWriter::new(
        LocalStorage::new(&config.output.path),
        config.writes_geojson(),
        config.writes_csv(),
    );

    let result = run(&cli.command, &service, &writer).await;

    match result {
        Ok(files) => {
            for file in &files {
                let path = Path::new(&config.output.path).join(file);
                tracing::info!("Output saved to: {}", path.display());
                println!("{}", path.display());
            }
        }
        Err(e) => {
            tracing::error!(
                "Request failed: {} (Category: {:?}, Status: {})",
                e,
                e.category(),
                e.status_code()
            );
            eprintln!("{}", e.user_friendly_message());

            let exit_code = match e.category() {
                ErrorCategory::Configuration => 1,
                ErrorCategory::Client => 2,
                ErrorCategory::Upstream => 3,
                ErrorCategory::Internal => 4,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(
    command: &Command,
    service: &PriocService,
    writer: &ResultWriter<LocalStorage>,
) -> prioc::Result<Vec<String>> {
    match command {
        Command::Hexes {
            object_type,
            territory_id,
        } => {
            let query = HexQuery {
                territory_id: *territory_id,
                object_type: object_type.parse::<ObjectType>()?,
            };
            let hexes = service.hexes_for_object(&query).await?;
            writer
                .write_hexes(&format!("hexes_{}", query.object_type.slug()), &hexes)
                .await
        }
        Command::Clusters {
            object_type,
            territory_id,
        } => {
            let query = HexQuery {
                territory_id: *territory_id,
                object_type: object_type.parse::<ObjectType>()?,
            };
            let clusters = service.hex_clusters_for_object(&query).await?;
            writer
                .write_clusters(&format!("clusters_{}", query.object_type.slug()), &clusters)
                .await
        }
        Command::Territory {
            geometry,
            territory_id,
        } => {
            let request = TerritoryRequest {
                territory_id: *territory_id,
                territory: read_territory(geometry)?,
            };
            let estimate = service.territory_estimation(&request).await?;
            writer.write_estimate("territory", &estimate).await
        }
        Command::Refresh { .. } => Ok(Vec::new()),
    }
}

async fn refresh(loader: &ReferenceLoader, interval: Option<u64>) -> anyhow::Result<()> {
    loop {
        let outcome = loader.refresh().await?;
        println!(
            "reference: {}, grid: {}",
            if outcome.reference_changed { "updated" } else { "unchanged" },
            if outcome.grid_changed { "updated" } else { "unchanged" }
        );

        match interval {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => return Ok(()),
        }
    }
}

/// Accepts a bare geometry, a feature or the first feature of a collection.
fn read_territory(path: &Path) -> prioc::Result<geojson::Geometry> {
    let text = std::fs::read_to_string(path)?;
    let geometry = match text.parse::<geojson::GeoJson>()? {
        geojson::GeoJson::Geometry(geometry) => Some(geometry),
        geojson::GeoJson::Feature(feature) => feature.geometry,
        geojson::GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .next()
            .and_then(|feature| feature.geometry),
    };
    geometry.ok_or_else(|| PriocError::InvalidGeometry {
        reason: format!("no geometry in '{}'", path.display()),
    })
}
