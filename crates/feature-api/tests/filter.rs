// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for filtered set materialization

mod fixtures;

use axum::http::StatusCode;
use fixtures::{feature_ids, link, spawn_server};
use serde_json::Value;

async fn get(url: &str) -> (StatusCode, Value) {
    let response = reqwest::get(url).await.expect("Failed to send request");
    let status = response.status();
    let body = response.json().await.expect("Failed to parse body");
    (status, body)
}

#[tokio::test]
async fn materialized_set_is_readable_as_collection() {
    let (base, _token) = spawn_server().await;
    let (status, body) = get(&format!("{base}/filter?highway=primary&name=primaries")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collectionName"], "primaries");
    assert_eq!(body["matchedCount"], 2);
    assert!(link(&body, "items").is_some_and(|href| href.ends_with("/collections/primaries/items")));

    let (status, items) = get(&format!("{base}/collections/primaries/items")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&items), vec![2, 3]);
    assert_eq!(items["numberMatched"], 2);

    let (_, listing) = get(&format!("{base}/collections")).await;
    let entry = listing["collections"]
        .as_array()
        .expect("collections")
        .iter()
        .find(|c| c["name"] == "primaries")
        .expect("materialized collection listed");
    assert_eq!(entry["kind"], "ephemeral");
}

#[tokio::test]
async fn extent_and_collection_restrict_the_set() {
    let (base, _token) = spawn_server().await;
    let (status, body) = get(&format!(
        "{base}/filter?collection=roads&extent=%5B0,0,20,20%5D&name=near-origin"
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedCount"], 4);

    let (_, items) = get(&format!("{base}/collections/near-origin/items")).await;
    assert_eq!(feature_ids(&items), vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn generated_names_are_unique() {
    let (base, _token) = spawn_server().await;
    let (_, first) = get(&format!("{base}/filter?kind=school")).await;
    let (_, second) = get(&format!("{base}/filter?kind=school")).await;

    let first = first["collectionName"].as_str().expect("name").to_string();
    let second = second["collectionName"].as_str().expect("name").to_string();
    assert_ne!(first, second);

    let (status, items) = get(&format!("{base}/collections/{first}/items")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&items), vec![7]);
}

#[tokio::test]
async fn empty_result_still_creates_a_collection() {
    let (base, _token) = spawn_server().await;
    let (status, body) = get(&format!("{base}/filter?highway=motorway&name=none")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedCount"], 0);

    let (status, items) = get(&format!("{base}/collections/none/items")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(feature_ids(&items).is_empty());
}

#[tokio::test]
async fn taken_names_conflict() {
    let (base, _token) = spawn_server().await;
    let (status, _) = get(&format!("{base}/filter?name=taken")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&format!("{base}/filter?name=taken")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, _) = get(&format!("{base}/filter?name=roads")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let (base, _token) = spawn_server().await;
    for query in [
        "name=..%2Fescape",
        "name=has%20space",
        "extent=1,2,3,4",
        "extent=%5B1,2,3%5D",
        "name=a&name=b",
    ] {
        let (status, _) = get(&format!("{base}/filter?{query}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
    }
}

#[tokio::test]
async fn unknown_source_collection_matches_nothing() {
    let (base, _token) = spawn_server().await;
    let (status, body) = get(&format!("{base}/filter?collection=rivers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedCount"], 0);
}
