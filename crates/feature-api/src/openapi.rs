// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `OpenAPI` documentation module
//!
//! The API definition served at `/api`.

use axum::Json;
use utoipa::OpenApi;

use crate::{
    config::Environment,
    document::{
        CollectionList, CollectionSummary, ConformanceDeclaration, FeatureCollectionResult,
        LandingPage, Link, MaterializedSetResult, SingleFeatureResult,
    },
    error::{ErrorBody, ErrorResult, StatusCategory},
    negotiation::ContentFormat,
    routes::handlers,
    state::HealthCheck,
};

/// `OpenAPI` document for the feature API
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Feature API",
        description = "OGC API Features access to geospatial collections, with ad-hoc filtered collections"
    ),
    paths(
        handlers::landing_handler,
        handlers::conformance_handler,
        handlers::collections_handler,
        handlers::collection_handler,
        handlers::items_handler,
        handlers::feature_handler,
        handlers::filter_handler,
        handlers::health_handler,
    ),
    components(schemas(
        Link,
        LandingPage,
        ConformanceDeclaration,
        CollectionSummary,
        CollectionList,
        SingleFeatureResult,
        FeatureCollectionResult,
        MaterializedSetResult,
        ErrorBody,
        ErrorResult,
        StatusCategory,
        ContentFormat,
        Environment,
        HealthCheck,
    )),
    tags(
        (name = "capabilities", description = "Landing page and conformance"),
        (name = "data", description = "Collections and features"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// `OpenAPI` specification endpoint
pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
