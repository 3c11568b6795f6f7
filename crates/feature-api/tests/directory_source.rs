// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests against a GeoJSON data directory

use axum::http::StatusCode;
use feature_api::{Server, ServerConfig, ShutdownConfig};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn write_collection(dir: &std::path::Path, name: &str, document: &Value) {
    std::fs::write(
        dir.join(format!("{name}.geojson")),
        serde_json::to_vec(document).expect("Failed to encode fixture"),
    )
    .expect("Failed to write fixture");
}

async fn spawn(data_dir: &std::path::Path) -> (String, CancellationToken) {
    let mut config = ServerConfig::for_testing();
    config.source.data_dir = Some(data_dir.to_path_buf());
    let (addr, token) = Server::new(config, ShutdownConfig::default())
        .expect("Failed to create server")
        .run_for_testing()
        .await
        .expect("Failed to start test server");
    (format!("http://{addr}"), token)
}

fn parks() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 11,
                "geometry": {"type": "Point", "coordinates": [1.0, 1.0]},
                "properties": {"kind": "playground"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [50.0, 50.0]},
                "properties": {"kind": "forest"}
            }
        ]
    })
}

#[tokio::test]
async fn serves_files_as_collections() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_collection(dir.path(), "parks", &parks());
    let (base, _token) = spawn(dir.path()).await;

    let listing: Value = reqwest::get(format!("{base}/collections"))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse body");
    assert_eq!(listing["collections"][0]["name"], "parks");

    let items: Value = reqwest::get(format!("{base}/collections/parks/items?bbox=0,0,10,10"))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse body");
    assert_eq!(items["numberMatched"], 1);
    assert_eq!(items["features"][0]["id"], 11);

    // features without an id are keyed by their 1-based position
    let forest = reqwest::get(format!("{base}/collections/parks/items/2"))
        .await
        .expect("Failed to send request");
    assert_eq!(forest.status(), StatusCode::OK);
    let forest: Value = forest.json().await.expect("Failed to parse body");
    assert_eq!(forest["properties"]["kind"], "forest");
}

#[tokio::test]
async fn files_added_at_runtime_are_visible() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_collection(dir.path(), "parks", &parks());
    let (base, _token) = spawn(dir.path()).await;

    let missing = reqwest::get(format!("{base}/collections/lakes/items"))
        .await
        .expect("Failed to send request");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    write_collection(dir.path(), "lakes", &json!({"type": "FeatureCollection", "features": []}));
    let found = reqwest::get(format!("{base}/collections/lakes/items"))
        .await
        .expect("Failed to send request");
    assert_eq!(found.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_directory_is_unavailable() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let gone = dir.path().join("gone");
    let (base, _token) = spawn(&gone).await;

    let listing = reqwest::get(format!("{base}/collections"))
        .await
        .expect("Failed to send request");
    assert_eq!(listing.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = listing.json().await.expect("Failed to parse body");
    assert_eq!(body["detail"], "feature source unavailable");

    let health = reqwest::get(format!("{base}/health"))
        .await
        .expect("Failed to send request");
    assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = health.json().await.expect("Failed to parse body");
    assert_eq!(body["status"]["reason"], "geojson-directory unavailable");
}

#[tokio::test]
async fn listing_etag_follows_new_files() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_collection(dir.path(), "parks", &parks());
    let (base, _token) = spawn(dir.path()).await;
    let client = reqwest::Client::new();

    let first = client
        .get(format!("{base}/collections"))
        .send()
        .await
        .expect("Failed to send request");
    let etag = first.headers()[reqwest::header::ETAG].clone();

    write_collection(dir.path(), "lakes", &json!({"type": "FeatureCollection", "features": []}));
    let second = client
        .get(format!("{base}/collections"))
        .header(reqwest::header::IF_NONE_MATCH, etag.clone())
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), StatusCode::OK);
    assert_ne!(second.headers()[reqwest::header::ETAG], etag);
    let listing: Value = second.json().await.expect("Failed to parse body");
    assert_eq!(listing["collections"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn extension_case_is_ignored() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(
        dir.path().join("parks.GeoJSON"),
        serde_json::to_vec(&parks()).expect("Failed to encode fixture"),
    )
    .expect("Failed to write fixture");
    let (base, _token) = spawn(dir.path()).await;

    let items: Value = reqwest::get(format!("{base}/collections/parks/items"))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse body");
    assert_eq!(items["numberMatched"], 2);
}
