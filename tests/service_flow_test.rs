use chrono::{Duration as ChronoDuration, Utc};
use httpmock::prelude::*;
use httpmock::Method::HEAD;
use httpmock::Mock;
use prioc::adapters::{
    DocumentCache, FileServerClient, GridHexProvider, ReferenceLoader, RefreshOutcome,
    UrbanApiClient,
};
use prioc::core::hdbscan::HdbscanParams;
use prioc::core::reference::ReferenceDocuments;
use prioc::domain::model::{HexQuery, ObjectType, TerritoryRequest, POPULATION, TRANSPORT};
use prioc::{PriocError, PriocService};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const OLD_STAMP: &str = "Mon, 01 Jan 2001 00:00:00 GMT";

fn documents() -> ReferenceDocuments {
    ReferenceDocuments {
        indicators_weights: "indicators_weights.json".to_string(),
        object_indicators_min_val: "object_indicators_min_val.json".to_string(),
        positive_service_cleaning: "positive_service_cleaning.json".to_string(),
        negative_service_cleaning: "negative_service_cleaning.json".to_string(),
    }
}

/// Five 0.01 degree squares in a row starting at 30E 59N. Square `i` has id
/// `i + 1`, population `2 * (i + 1)` and transport 3.
fn grid_document() -> Value {
    let features: Vec<Value> = (0..5)
        .map(|i| {
            let west = 30.0 + 0.01 * i as f64;
            let east = west + 0.01;
            json!({
                "type": "Feature",
                "id": i + 1,
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [west, 59.0], [east, 59.0], [east, 59.01], [west, 59.01], [west, 59.0]
                    ]]
                },
                "properties": {
                    POPULATION: 2.0 * (i + 1) as f64,
                    TRANSPORT: 3.0
                }
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

fn weights_document() -> Value {
    json!({
        "Порт": { POPULATION: 1, TRANSPORT: 2 },
        "Тур база": { "Показатель: Экология": 1 }
    })
}

fn point_collection(lon: f64, lat: f64) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [lon, lat] },
            "properties": { "service_id": 100 }
        }]
    })
}

async fn mount_document<'a>(
    server: &'a MockServer,
    name: &str,
    stamp: &str,
    body: Value,
) -> (Mock<'a>, Mock<'a>) {
    let path = format!("/prioc/{}", name);
    let head_path = path.clone();
    let head = server
        .mock_async(|when, then| {
            when.method(HEAD).path(head_path);
            then.status(200).header("Last-Modified", stamp);
        })
        .await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(body);
        })
        .await;
    (head, get)
}

async fn mount_file_server(server: &MockServer) {
    mount_document(server, "indicators_weights.json", OLD_STAMP, weights_document()).await;
    mount_document(
        server,
        "object_indicators_min_val.json",
        OLD_STAMP,
        json!({ "Порт": { POPULATION: 3.0 } }),
    )
    .await;
    mount_document(
        server,
        "positive_service_cleaning.json",
        OLD_STAMP,
        json!({ "Порт": [5] }),
    )
    .await;
    mount_document(
        server,
        "negative_service_cleaning.json",
        OLD_STAMP,
        json!({ "Порт": null, "Тур база": [7] }),
    )
    .await;
    mount_document(server, "hexes.geojson", OLD_STAMP, grid_document()).await;
}

async fn mount_urban_api(server: &MockServer) {
    // A port within the third square.
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/territory/1/services_geojson")
                .query_param("service_type_id", "5")
                .query_param("centers_only", "false");
            then.status(200).json_body(point_collection(30.025, 59.005));
        })
        .await;
    // A camp site inside the first square.
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/territory/1/services_geojson")
                .query_param("service_type_id", "7")
                .query_param("centers_only", "true");
            then.status(200).json_body(point_collection(30.005, 59.005));
        })
        .await;
}

async fn load(server: &MockServer, cache_dir: &TempDir) -> ReferenceLoader {
    let fileserver =
        FileServerClient::new(server.base_url(), "prioc", Duration::from_secs(5)).unwrap();
    let cache = DocumentCache::new(cache_dir.path()).unwrap();
    ReferenceLoader::load(Arc::new(fileserver), cache, documents(), "hexes.geojson".to_string())
        .await
        .unwrap()
}

fn service(loader: &ReferenceLoader, urban_api: &MockServer) -> PriocService {
    PriocService::new(
        Arc::new(GridHexProvider::new(loader.grid(), 1)),
        Arc::new(UrbanApiClient::new(urban_api.base_url(), Duration::from_secs(5)).unwrap()),
        loader.reference(),
        HdbscanParams::default(),
    )
}

#[tokio::test]
async fn test_hexes_for_port_keep_only_the_served_square() {
    let fileserver = MockServer::start_async().await;
    let urban_api = MockServer::start_async().await;
    mount_file_server(&fileserver).await;
    mount_urban_api(&urban_api).await;

    let cache_dir = TempDir::new().unwrap();
    let loader = load(&fileserver, &cache_dir).await;
    assert_eq!(loader.grid().current().len(), 5);

    let hexes = service(&loader, &urban_api)
        .hexes_for_object(&HexQuery {
            territory_id: 1,
            object_type: ObjectType::Port,
        })
        .await
        .unwrap();

    assert_eq!(hexes.len(), 1);
    assert_eq!(hexes[0].id, 3);
    // 2/3 * population 6 + 1/3 * transport 3
    approx::assert_relative_eq!(hexes[0].weighted_score.unwrap(), 5.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_territory_estimation_drops_types_already_served_inside() {
    let fileserver = MockServer::start_async().await;
    let urban_api = MockServer::start_async().await;
    mount_file_server(&fileserver).await;
    mount_urban_api(&urban_api).await;

    let cache_dir = TempDir::new().unwrap();
    let loader = load(&fileserver, &cache_dir).await;

    let territory: geojson::Geometry = serde_json::from_value(json!({
        "type": "Polygon",
        "coordinates": [[
            [30.002, 59.002], [30.018, 59.002], [30.018, 59.008], [30.002, 59.008], [30.002, 59.002]
        ]]
    }))
    .unwrap();

    let estimate = service(&loader, &urban_api)
        .territory_estimation(&TerritoryRequest {
            territory_id: 1,
            territory,
        })
        .await
        .unwrap();

    // Mean population 3 sits at the minimum; transport 3 against no minimum.
    assert_eq!(estimate.len(), 1);
    assert_eq!(estimate.get(&ObjectType::Port), Some(&1.0));
    assert!(!estimate.contains_key(&ObjectType::TouristBase));
}

#[tokio::test]
async fn test_upstream_failure_keeps_status_and_body() {
    let fileserver = MockServer::start_async().await;
    let urban_api = MockServer::start_async().await;
    mount_file_server(&fileserver).await;
    urban_api
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/territory/1/services_geojson");
            then.status(500).body("database is down");
        })
        .await;

    let cache_dir = TempDir::new().unwrap();
    let loader = load(&fileserver, &cache_dir).await;

    let result = service(&loader, &urban_api)
        .hexes_for_object(&HexQuery {
            territory_id: 1,
            object_type: ObjectType::Port,
        })
        .await;

    match result {
        Err(PriocError::Upstream { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database is down");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_unsupported_territory_is_a_client_error() {
    let fileserver = MockServer::start_async().await;
    let urban_api = MockServer::start_async().await;
    mount_file_server(&fileserver).await;
    mount_urban_api(&urban_api).await;

    let cache_dir = TempDir::new().unwrap();
    let loader = load(&fileserver, &cache_dir).await;

    let error = service(&loader, &urban_api)
        .hexes_for_object(&HexQuery {
            territory_id: 2,
            object_type: ObjectType::TouristBase,
        })
        .await
        .unwrap_err();
    assert_eq!(error.status_code(), 400);
}

#[tokio::test]
async fn test_refresh_reinstalls_only_changed_documents() {
    let fileserver = MockServer::start_async().await;
    let (weights_head, weights_get) =
        mount_document(&fileserver, "indicators_weights.json", OLD_STAMP, weights_document()).await;
    for (name, body) in [
        ("object_indicators_min_val.json", json!({ "Порт": { POPULATION: 3.0 } })),
        ("positive_service_cleaning.json", json!({ "Порт": [5] })),
        ("negative_service_cleaning.json", json!({ "Тур база": [7] })),
        ("hexes.geojson", grid_document()),
    ] {
        mount_document(&fileserver, name, OLD_STAMP, body).await;
    }

    let cache_dir = TempDir::new().unwrap();
    let loader = load(&fileserver, &cache_dir).await;
    let reference = loader.reference();
    approx::assert_relative_eq!(
        reference.current().weights(ObjectType::Port)[POPULATION],
        2.0 / 3.0,
        epsilon = 1e-9
    );

    let outcome = loader.refresh().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::default());

    // A newer weights document where transport ranks first.
    weights_head.delete_async().await;
    weights_get.delete_async().await;
    let newer = (Utc::now() + ChronoDuration::hours(1)).to_rfc2822();
    mount_document(
        &fileserver,
        "indicators_weights.json",
        &newer,
        json!({ "Порт": { TRANSPORT: 1, POPULATION: 2 } }),
    )
    .await;

    let outcome = loader.refresh().await.unwrap();
    assert_eq!(
        outcome,
        RefreshOutcome {
            reference_changed: true,
            grid_changed: false,
        }
    );
    // Handed-out snapshots see the new weights.
    approx::assert_relative_eq!(
        reference.current().weights(ObjectType::Port)[TRANSPORT],
        2.0 / 3.0,
        epsilon = 1e-9
    );
}
