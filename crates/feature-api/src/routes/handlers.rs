// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Every document endpoint computes its fingerprint from the request alone and
//! hands a build closure to [`deliver`]; the closure only runs when a body is
//! actually needed.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use feature_query::ContentFingerprint;
use feature_source::HealthStatus;

use crate::{
    delivery::{deliver, media_type, reject},
    document::{
        CONFORMANCE_CLASSES, CollectionList, CollectionSummary, ConformanceDeclaration, Document,
        DocumentKind, FeatureCollectionResult, LandingPage, Link, MaterializedSetResult,
        SingleFeatureResult,
    },
    error::{ErrorBody, ServerError},
    extractors::{FilterParams, ItemsParams, RequestContext, path_segment},
    negotiation::ContentFormat,
    state::{HealthCheck, ServerState},
};

const OPENAPI_CONTENT_TYPE: &str = "application/vnd.oai.openapi+json;version=3.0";

fn with_format(pairs: &[(String, String)], format: ContentFormat) -> Vec<(String, String)> {
    let mut pairs = pairs.to_vec();
    pairs.push(("f".to_string(), format.query_value().to_string()));
    pairs
}

/// Self link in the negotiated format plus one alternate link per other format
fn self_and_alternates(
    ctx: &RequestContext,
    path: &str,
    pairs: &[(String, String)],
    kind: DocumentKind,
) -> (Link, Vec<Link>) {
    let current = ctx.format().unwrap_or(ContentFormat::Json);
    let self_link = Link::new(
        ctx.href(path, &with_format(pairs, current)),
        "self",
        media_type(kind, current),
    );
    let alternate = ContentFormat::ALL
        .into_iter()
        .filter(|format| *format != current)
        .map(|format| {
            Link::new(
                ctx.href(path, &with_format(pairs, format)),
                "alternate",
                media_type(kind, format),
            )
            .with_title(format!("this document as {}", format.query_value()))
        })
        .collect();
    (self_link, alternate)
}

fn collection_path(name: &str) -> String {
    format!("/collections/{}", path_segment(name))
}

fn collection_links(ctx: &RequestContext, name: &str) -> Vec<Link> {
    let path = collection_path(name);
    vec![
        Link::new(ctx.href(&path, &[]), "self", "application/json").with_title(name),
        Link::new(
            ctx.href(&format!("{path}/items"), &[]),
            "items",
            "application/geo+json",
        )
        .with_title(format!("{name} features")),
    ]
}

/// Landing page handler
#[utoipa::path(
    get,
    path = "/",
    tag = "capabilities",
    summary = "Landing page",
    description = "Links to the API definition, the conformance declaration and the collections.",
    params(("f" = Option<String>, Query, description = "Response format: json or html")),
    responses(
        (status = 200, description = "Landing page", body = LandingPage),
        (status = 304, description = "Not modified"),
        (status = 400, description = "Unsupported format", body = ErrorBody)
    )
)]
pub async fn landing_handler(State(state): State<ServerState>, ctx: RequestContext) -> Response {
    let metadata = &state.config().metadata;
    let fingerprint = ContentFingerprint::of_parts(
        "landing",
        [metadata.title.as_str(), metadata.description.as_str()],
    );
    deliver(&state, &ctx, "landing", DocumentKind::Landing, Some(fingerprint), || async {
        let (self_link, alternate) = self_and_alternates(&ctx, "/", &[], DocumentKind::Landing);
        let mut links = vec![self_link];
        links.extend(alternate);
        links.extend([
            Link::new(ctx.href("/api", &[]), "service-desc", OPENAPI_CONTENT_TYPE)
                .with_title("API definition"),
            Link::new(ctx.href("/conformance", &[]), "conformance", "application/json")
                .with_title("Conformance classes"),
            Link::new(ctx.href("/collections", &[]), "data", "application/json")
                .with_title("Collections"),
        ]);
        Ok(Document::Landing(LandingPage {
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            links,
        }))
    })
    .await
}

/// Conformance declaration handler
#[utoipa::path(
    get,
    path = "/conformance",
    tag = "capabilities",
    summary = "Conformance declaration",
    responses(
        (status = 200, description = "Implemented conformance classes", body = ConformanceDeclaration),
        (status = 304, description = "Not modified")
    )
)]
pub async fn conformance_handler(State(state): State<ServerState>, ctx: RequestContext) -> Response {
    let fingerprint = ContentFingerprint::of_parts("conformance", CONFORMANCE_CLASSES);
    deliver(&state, &ctx, "conformance", DocumentKind::Conformance, Some(fingerprint), || async {
        Ok(Document::Conformance(ConformanceDeclaration::default()))
    })
    .await
}

/// Collection listing handler
#[utoipa::path(
    get,
    path = "/collections",
    tag = "data",
    summary = "List collections",
    description = "All source collections and ephemeral collections, sorted by name.",
    params(("f" = Option<String>, Query, description = "Response format: json or html")),
    responses(
        (status = 200, description = "Collections", body = CollectionList),
        (status = 304, description = "Not modified"),
        (status = 503, description = "Feature source unavailable", body = ErrorBody)
    )
)]
pub async fn collections_handler(State(state): State<ServerState>, ctx: RequestContext) -> Response {
    // listed before fingerprinting; source collections change at runtime
    let listing = match state.orchestrator().list_collections().await {
        Ok(listing) => listing,
        Err(e) => return reject("collections", e.into()),
    };
    let fingerprint = ContentFingerprint::for_listing(&listing);
    deliver(&state, &ctx, "collections", DocumentKind::Collections, Some(fingerprint), || async {
        let collections = listing
            .into_iter()
            .map(|info| CollectionSummary {
                links: collection_links(&ctx, &info.name),
                title: info.name.clone(),
                kind: CollectionSummary::kind_label(info.kind),
                name: info.name,
            })
            .collect();
        let (self_link, alternate) =
            self_and_alternates(&ctx, "/collections", &[], DocumentKind::Collections);
        let mut links = vec![self_link];
        links.extend(alternate);
        Ok::<_, ServerError>(Document::Collections(CollectionList { collections, links }))
    })
    .await
}

/// Single collection handler
#[utoipa::path(
    get,
    path = "/collections/{name}",
    tag = "data",
    summary = "Describe a collection",
    params(
        ("name" = String, Path, description = "Collection name"),
        ("f" = Option<String>, Query, description = "Response format: json or html")
    ),
    responses(
        (status = 200, description = "Collection", body = CollectionSummary),
        (status = 404, description = "Unknown collection", body = ErrorBody)
    )
)]
pub async fn collection_handler(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    ctx: RequestContext,
) -> Response {
    let fingerprint = ContentFingerprint::of_parts("collection", [name.as_str()]);
    deliver(&state, &ctx, "collection", DocumentKind::Collection, Some(fingerprint), || async {
        let info = state.orchestrator().collection(&name).await?;
        Ok::<_, ServerError>(Document::Collection(CollectionSummary {
            links: collection_links(&ctx, &info.name),
            title: info.name.clone(),
            kind: CollectionSummary::kind_label(info.kind),
            name: info.name,
        }))
    })
    .await
}

/// Feature page handler
///
/// Any query parameter other than `f`, `page`, `limit`, `bbox` and `time` is an
/// exact-match property filter.
#[utoipa::path(
    get,
    path = "/collections/{name}/items",
    tag = "data",
    summary = "Page through a collection's features",
    params(
        ("name" = String, Path, description = "Collection name"),
        ("limit" = Option<u64>, Query, description = "Page size, clamped to the configured maximum"),
        ("page" = Option<u64>, Query, description = "Zero-based page number"),
        ("bbox" = Option<String>, Query, description = "minx,miny,maxx,maxy"),
        ("time" = Option<String>, Query, description = "Instant or start/stop interval, `..` for an open bound"),
        ("f" = Option<String>, Query, description = "Response format: json or html")
    ),
    responses(
        (status = 200, description = "GeoJSON feature collection", body = FeatureCollectionResult),
        (status = 304, description = "Not modified"),
        (status = 400, description = "Malformed query", body = ErrorBody),
        (status = 404, description = "Unknown collection", body = ErrorBody),
        (status = 503, description = "Feature source unavailable", body = ErrorBody)
    )
)]
pub async fn items_handler(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    ctx: RequestContext,
) -> Response {
    let params = match ItemsParams::parse(ctx.query(), state.orchestrator().paging()) {
        Ok(params) => params,
        Err(e) => return reject("items", e),
    };
    let window = params.window;
    let fingerprint = ContentFingerprint::for_page(
        &name,
        &params.filter,
        params.bbox.as_ref(),
        window.start,
        window.stop,
    );

    deliver(&state, &ctx, "items", DocumentKind::FeatureCollection, Some(fingerprint), || async {
        let orchestrator = state.orchestrator();
        orchestrator.collection(&name).await?;
        let page = orchestrator
            .feature_page(
                &name,
                &params.filter,
                params.bbox.as_ref(),
                window.start,
                window.stop,
            )
            .await?;

        let path = format!("{}/items", collection_path(&name));
        let page_pairs = |number: u64| {
            let mut pairs = params.link_pairs.clone();
            pairs.push(("limit".to_string(), window.limit.to_string()));
            pairs.push(("page".to_string(), number.to_string()));
            pairs
        };
        let (self_link, alternate) = self_and_alternates(
            &ctx,
            &path,
            &page_pairs(window.page),
            DocumentKind::FeatureCollection,
        );
        let format = ctx.format().unwrap_or(ContentFormat::Json);
        let link = |rel: &str, number: u64| {
            Link::new(
                ctx.href(&path, &with_format(&page_pairs(number), format)),
                rel,
                media_type(DocumentKind::FeatureCollection, format),
            )
        };

        Ok::<_, ServerError>(Document::FeatureCollection(FeatureCollectionResult {
            returned: page.features.len() as u64,
            total_matched: page.total_matched,
            prev_link: window.page.checked_sub(1).map(|prev| link("prev", prev)),
            next_link: (window.stop < page.total_matched).then(|| link("next", window.page + 1)),
            features: page.features,
            self_link,
            alternate,
        }))
    })
    .await
}

/// Single feature handler
#[utoipa::path(
    get,
    path = "/collections/{name}/items/{feature_id}",
    tag = "data",
    summary = "Fetch one feature",
    params(
        ("name" = String, Path, description = "Collection name"),
        ("feature_id" = u64, Path, description = "Feature primary key"),
        ("f" = Option<String>, Query, description = "Response format: json or html")
    ),
    responses(
        (status = 200, description = "GeoJSON feature", body = SingleFeatureResult),
        (status = 304, description = "Not modified"),
        (status = 400, description = "Non-numeric feature id", body = ErrorBody),
        (status = 404, description = "Unknown feature", body = ErrorBody),
        (status = 503, description = "Feature source unavailable", body = ErrorBody)
    )
)]
pub async fn feature_handler(
    State(state): State<ServerState>,
    Path((name, feature_id)): Path<(String, String)>,
    ctx: RequestContext,
) -> Response {
    let Ok(id) = feature_id.parse::<u64>() else {
        return reject(
            "feature",
            ServerError::bad_request(format!("feature id '{feature_id}' is not a non-negative integer")),
        );
    };
    let fingerprint = ContentFingerprint::for_feature(&name, id);

    deliver(&state, &ctx, "feature", DocumentKind::Feature, Some(fingerprint), || async {
        let feature = state.orchestrator().single_feature(&name, id).await?;
        let path = format!("{}/items/{id}", collection_path(&name));
        let (self_link, alternate) = self_and_alternates(&ctx, &path, &[], DocumentKind::Feature);
        let collection_link =
            Link::new(ctx.href(&collection_path(&name), &[]), "collection", "application/json")
                .with_title(name.clone());
        Ok::<_, ServerError>(Document::Feature(Box::new(SingleFeatureResult {
            feature,
            self_link,
            collection_link,
            alternate,
        })))
    })
    .await
}

/// Filter materialization handler
///
/// Filters the named collections (every source collection when none is named)
/// and stores the matching features as a new ephemeral collection.
#[utoipa::path(
    get,
    path = "/filter",
    tag = "data",
    summary = "Materialize a filtered set as a new collection",
    params(
        ("collection" = Option<Vec<String>>, Query, description = "Collection to filter, repeatable"),
        ("extent" = Option<String>, Query, description = "JSON array [minx,miny,maxx,maxy]"),
        ("name" = Option<String>, Query, description = "Name for the new collection; generated when absent"),
        ("f" = Option<String>, Query, description = "Response format: json or html")
    ),
    responses(
        (status = 200, description = "New collection", body = MaterializedSetResult),
        (status = 400, description = "Malformed query or collection name", body = ErrorBody),
        (status = 409, description = "Name already taken", body = ErrorBody),
        (status = 503, description = "Feature source unavailable", body = ErrorBody)
    )
)]
pub async fn filter_handler(State(state): State<ServerState>, ctx: RequestContext) -> Response {
    let params = match FilterParams::parse(ctx.query()) {
        Ok(params) => params,
        Err(e) => return reject("filter", e),
    };

    deliver(&state, &ctx, "filter", DocumentKind::MaterializedSet, None, || async {
        let set = state
            .orchestrator()
            .materialize_filtered_set(
                &params.collections,
                &params.filter,
                params.extent.as_ref(),
                params.name.as_deref(),
            )
            .await?;
        Ok::<_, ServerError>(Document::MaterializedSet(MaterializedSetResult {
            links: collection_links(&ctx, &set.collection_name),
            collection_name: set.collection_name,
            matched_count: set.matched_count,
        }))
    })
    .await
}

/// Health check endpoint handler
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check endpoint",
    description = "Returns the status of the feature source along with version and environment information.",
    responses(
        (status = 200, description = "Feature source reachable", body = HealthCheck),
        (status = 503, description = "Feature source down", body = HealthCheck)
    )
)]
pub async fn health_handler(State(state): State<ServerState>) -> Response {
    let health = state.health_check().await;
    let status = match health.status {
        HealthStatus::Down { .. } => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Up | HealthStatus::Degraded { .. } => StatusCode::OK,
    };
    (status, Json(health)).into_response()
}
