// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for conditional requests and content negotiation

mod fixtures;

use axum::http::StatusCode;
use fixtures::spawn_server;
use reqwest::{Client, header};

fn etag(response: &reqwest::Response) -> String {
    response.headers()[header::ETAG]
        .to_str()
        .expect("ascii etag")
        .to_string()
}

#[tokio::test]
async fn etag_is_stable_across_formats() {
    let (base, _token) = spawn_server().await;
    let client = Client::new();
    let url = format!("{base}/collections/roads/items?limit=2");

    let json = client.get(&url).send().await.expect("Failed to send request");
    let again = client.get(&url).send().await.expect("Failed to send request");
    let html = client
        .get(format!("{url}&f=html"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(etag(&json), etag(&again));
    assert_eq!(etag(&json), etag(&html));
}

#[tokio::test]
async fn different_pages_have_different_etags() {
    let (base, _token) = spawn_server().await;
    let first = reqwest::get(format!("{base}/collections/roads/items?limit=2&page=0"))
        .await
        .expect("Failed to send request");
    let second = reqwest::get(format!("{base}/collections/roads/items?limit=2&page=1"))
        .await
        .expect("Failed to send request");
    let filtered = reqwest::get(format!("{base}/collections/roads/items?limit=2&highway=primary"))
        .await
        .expect("Failed to send request");

    assert_ne!(etag(&first), etag(&second));
    assert_ne!(etag(&first), etag(&filtered));
}

#[tokio::test]
async fn matching_if_none_match_is_not_modified() {
    let (base, _token) = spawn_server().await;
    let client = Client::new();
    let url = format!("{base}/collections/roads/items/2");

    let first = client.get(&url).send().await.expect("Failed to send request");
    let tag = etag(&first);

    let cached = client
        .get(&url)
        .header(header::IF_NONE_MATCH, &tag)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(cached.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(etag(&cached), tag);
    assert!(cached.bytes().await.expect("Failed to read body").is_empty());

    let stale = client
        .get(&url)
        .header(header::IF_NONE_MATCH, "\"something-else\"")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(stale.status(), StatusCode::OK);
}

#[tokio::test]
async fn head_has_headers_but_no_body() {
    let (base, _token) = spawn_server().await;
    let client = Client::new();
    let response = client
        .head(format!("{base}/collections/roads/items"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::ETAG));
    assert!(response.bytes().await.expect("Failed to read body").is_empty());
}

#[tokio::test]
async fn head_on_filter_materializes_nothing() {
    let (base, _token) = spawn_server().await;
    let client = Client::new();
    let response = client
        .head(format!("{base}/filter?name=never"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::ETAG));

    let missing = client
        .get(format!("{base}/collections/never"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn html_rendering() {
    let (base, _token) = spawn_server().await;
    let response = reqwest::get(format!("{base}/collections/roads/items?f=html"))
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .expect("ascii header")
            .starts_with("text/html")
    );
    let body = response.text().await.expect("Failed to read body");
    assert!(body.starts_with("<!DOCTYPE html>"));
    assert!(body.contains("primary"));
}

#[tokio::test]
async fn accept_header_selects_html() {
    let (base, _token) = spawn_server().await;
    let response = Client::new()
        .get(format!("{base}/collections"))
        .header(header::ACCEPT, "text/html")
        .send()
        .await
        .expect("Failed to send request");
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .expect("ascii header")
            .starts_with("text/html")
    );
}

#[tokio::test]
async fn explicit_format_wins_over_accept() {
    let (base, _token) = spawn_server().await;
    let response = Client::new()
        .get(format!("{base}/collections?f=json"))
        .header(header::ACCEPT, "text/html")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().expect("ascii header"),
        "application/json"
    );
}

#[tokio::test]
async fn unsupported_format_is_rejected() {
    let (base, _token) = spawn_server().await;
    let response = reqwest::get(format!("{base}/collections?f=xml"))
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("Failed to parse body");
    assert!(body["detail"].as_str().is_some_and(|d| d.contains("xml")));
}

#[tokio::test]
async fn head_rejects_unsupported_format() {
    let (base, _token) = spawn_server().await;
    let response = Client::new()
        .head(format!("{base}/collections/roads/items?f=xml"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn head_matches_get_headers() {
    let (base, _token) = spawn_server().await;
    let client = Client::new();
    for path in ["/collections/roads/items", "/collections/roads/items/2", "/collections"] {
        let get = client
            .get(format!("{base}{path}"))
            .send()
            .await
            .expect("Failed to send request");
        let head = client
            .head(format!("{base}{path}"))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(
            head.headers()[header::CONTENT_TYPE],
            get.headers()[header::CONTENT_TYPE],
            "{path}"
        );
        assert_eq!(etag(&head), etag(&get), "{path}");
    }
}
