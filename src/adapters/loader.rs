use crate::adapters::cache::{DocumentCache, ResolvedDocument};
use crate::adapters::grid::HexGrid;
use crate::core::reference::{ReferenceConfig, ReferenceDocuments};
use crate::core::snapshot::Snapshot;
use crate::domain::ports::DocumentSource;
use crate::utils::error::{PriocError, Result};
use futures_util::future::try_join_all;
use std::sync::Arc;

/// What a refresh replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub reference_changed: bool,
    pub grid_changed: bool,
}

/// Builds the reference configuration and hex grid snapshots from the file
/// server and re-installs them when a document changes.
pub struct ReferenceLoader {
    source: Arc<dyn DocumentSource>,
    cache: DocumentCache,
    documents: ReferenceDocuments,
    grid_document: String,
    reference: Arc<Snapshot<ReferenceConfig>>,
    grid: Arc<Snapshot<HexGrid>>,
}

impl ReferenceLoader {
    pub async fn load(
        source: Arc<dyn DocumentSource>,
        cache: DocumentCache,
        documents: ReferenceDocuments,
        grid_document: String,
    ) -> Result<Self> {
        tracing::info!("Loading reference documents and hex grid");
        let (reference_docs, grid_doc) = tokio::try_join!(
            resolve_all(source.as_ref(), &cache, &documents),
            cache.resolve(source.as_ref(), &grid_document)
        )?;

        let reference = build_reference(&reference_docs)?;
        let grid = HexGrid::from_geojson(&grid_doc.bytes)?;

        Ok(Self {
            source,
            cache,
            documents,
            grid_document,
            reference: Arc::new(Snapshot::new(reference)),
            grid: Arc::new(Snapshot::new(grid)),
        })
    }

    pub fn reference(&self) -> Arc<Snapshot<ReferenceConfig>> {
        Arc::clone(&self.reference)
    }

    pub fn grid(&self) -> Arc<Snapshot<HexGrid>> {
        Arc::clone(&self.grid)
    }

    /// Re-checks every document; snapshots are rebuilt only for changed ones.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let (reference_docs, grid_doc) = tokio::try_join!(
            resolve_all(self.source.as_ref(), &self.cache, &self.documents),
            self.cache.resolve(self.source.as_ref(), &self.grid_document)
        )?;

        let mut outcome = RefreshOutcome::default();

        if reference_docs.iter().any(|doc| doc.downloaded) {
            self.reference.replace(build_reference(&reference_docs)?);
            outcome.reference_changed = true;
        }
        if grid_doc.downloaded {
            self.grid.replace(HexGrid::from_geojson(&grid_doc.bytes)?);
            outcome.grid_changed = true;
        }

        tracing::info!(
            "Refresh done: reference {}, grid {}",
            if outcome.reference_changed { "updated" } else { "unchanged" },
            if outcome.grid_changed { "updated" } else { "unchanged" }
        );
        Ok(outcome)
    }
}

async fn resolve_all(
    source: &dyn DocumentSource,
    cache: &DocumentCache,
    documents: &ReferenceDocuments,
) -> Result<Vec<ResolvedDocument>> {
    try_join_all(documents.names().map(|name| cache.resolve(source, name))).await
}

fn build_reference(docs: &[ResolvedDocument]) -> Result<ReferenceConfig> {
    match docs {
        [weights, min_values, positive, negative] => ReferenceConfig::from_documents(
            &weights.bytes,
            &min_values.bytes,
            &positive.bytes,
            &negative.bytes,
        ),
        _ => Err(PriocError::ConfigError {
            message: format!("Expected 4 reference documents, got {}", docs.len()),
        }),
    }
}
