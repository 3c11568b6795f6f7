// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! This module provides route configuration for the feature API server. Every
//! `GET` route also answers `HEAD`.

pub mod handlers;

use axum::{Router, routing::get};
use handlers::{
    collection_handler, collections_handler, conformance_handler, feature_handler, filter_handler,
    health_handler, items_handler, landing_handler,
};

use crate::{metrics::metrics_handler, openapi::openapi_spec, state::ServerState};

/// Create application routes
pub fn create_routes() -> Router<ServerState> {
    // Monitoring endpoints
    let ops_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    let capability_routes = Router::new()
        .route("/", get(landing_handler))
        .route("/conformance", get(conformance_handler))
        .route("/api", get(openapi_spec));

    let data_routes = Router::new()
        .route("/collections", get(collections_handler))
        .route("/collections/{name}", get(collection_handler))
        .route("/collections/{name}/items", get(items_handler))
        .route("/collections/{name}/items/{feature_id}", get(feature_handler))
        .route("/filter", get(filter_handler));

    Router::new()
        .merge(ops_routes)
        .merge(capability_routes)
        .merge(data_routes)
}
