// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Test fixtures
//!
//! Reusable collections and a running test server backed by them.

#![allow(dead_code)]

use feature_api::{Server, ServerConfig, ShutdownConfig};
use feature_providers::MemorySource;
use serde_json::json;
use shared_types::Feature;
use tokio_util::sync::CancellationToken;

/// Five roads; 2 and 3 are primary, 3 lies far from the others
pub fn roads() -> Vec<Feature> {
    vec![
        Feature::new("roads", 1)
            .with_property("highway", "secondary")
            .with_geometry(json!({"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]})),
        Feature::new("roads", 2)
            .with_property("highway", "primary")
            .with_property("lanes", 2)
            .with_geometry(json!({"type": "Point", "coordinates": [10.0, 10.0]})),
        Feature::new("roads", 3)
            .with_property("highway", "primary")
            .with_geometry(json!({"type": "Point", "coordinates": [100.0, 50.0]})),
        Feature::new("roads", 4)
            .with_property("highway", "residential")
            .with_geometry(json!({"type": "Point", "coordinates": [2.0, 2.0]})),
        Feature::new("roads", 5).with_property("highway", "residential"),
    ]
}

/// Two buildings
pub fn buildings() -> Vec<Feature> {
    vec![
        Feature::new("buildings", 7).with_property("kind", "school"),
        Feature::new("buildings", 8).with_property("kind", "hospital"),
    ]
}

/// Events with interval, instant and missing time metadata
pub fn events() -> Vec<Feature> {
    vec![
        Feature::new("events", 1)
            .with_property("name", "january")
            .with_property("start_time", "2018-01-01T00:00:00Z")
            .with_property("stop_time", "2018-01-31T23:59:59Z"),
        Feature::new("events", 2)
            .with_property("name", "midsummer")
            .with_property("timestamp", "2018-06-15T12:00:00Z"),
        Feature::new("events", 3).with_property("name", "undated"),
    ]
}

/// Source holding `roads`, `buildings` and `events`
pub fn source() -> MemorySource {
    MemorySource::new()
        .with_collection("roads", roads())
        .with_collection("buildings", buildings())
        .with_collection("events", events())
}

/// Start a server over [`source`] and return its base URL
pub async fn spawn_server() -> (String, CancellationToken) {
    spawn_server_with(ServerConfig::for_testing()).await
}

/// Start a server over [`source`] with a custom configuration
pub async fn spawn_server_with(config: ServerConfig) -> (String, CancellationToken) {
    let (addr, token) = Server::with_source(config, ShutdownConfig::default(), source())
        .expect("Failed to create server")
        .run_for_testing()
        .await
        .expect("Failed to start test server");
    (format!("http://{addr}"), token)
}

/// Feature ids of a GeoJSON feature collection body
pub fn feature_ids(body: &serde_json::Value) -> Vec<u64> {
    body["features"]
        .as_array()
        .expect("features array")
        .iter()
        .map(|f| f["id"].as_u64().expect("numeric id"))
        .collect()
}

/// The `href` of the link with relation `rel`
pub fn link<'a>(body: &'a serde_json::Value, rel: &str) -> Option<&'a str> {
    body["links"]
        .as_array()?
        .iter()
        .find(|l| l["rel"] == rel)
        .and_then(|l| l["href"].as_str())
}
