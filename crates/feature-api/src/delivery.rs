// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Content delivery pipeline
//!
//! Per request: format selection, then either a conditional short circuit or
//! the document build, then schema validation for JSON, then the response.
//! `HEAD` and matching `If-None-Match` requests never run the build, but an
//! unsupported format is rejected before either.

use std::time::Instant;

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use feature_query::ContentFingerprint;
use tracing::debug;

use crate::{
    document::{Document, DocumentKind},
    error::{ServerError, ServerResult},
    extractors::RequestContext,
    html,
    metrics,
    negotiation::ContentFormat,
    state::ServerState,
};

const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";

/// Media type of a document in a format
pub fn media_type(kind: DocumentKind, format: ContentFormat) -> &'static str {
    match (format, kind) {
        (ContentFormat::Json, DocumentKind::Feature | DocumentKind::FeatureCollection) => {
            GEOJSON_CONTENT_TYPE
        }
        (format, _) => format.content_type(),
    }
}

fn with_etag(mut response: Response, fingerprint: Option<&ContentFingerprint>) -> Response {
    if let Some(value) = fingerprint.and_then(|fp| HeaderValue::from_str(&fp.etag()).ok()) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}

fn outcome(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "server_error"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "ok"
    }
}

/// Turn an error into a response and count it
pub fn reject(endpoint: &'static str, error: ServerError) -> Response {
    let response = error.into_response();
    metrics::inc_requests(endpoint, outcome(response.status()));
    response
}

/// Serialize, validate and render a built document
///
/// # Errors
///
/// Returns `ServerError::SchemaValidation` when a JSON body does not match
/// its declared schema, or `ServerError::Render` when it cannot be serialized.
pub fn render(state: &ServerState, document: &Document, format: ContentFormat) -> ServerResult<String> {
    match format {
        ContentFormat::Json => {
            let value = document.to_json()?;
            if let Err(e) = state.schemas().validate(document.kind(), &value) {
                metrics::record_schema_failure();
                return Err(e);
            }
            serde_json::to_string(&value).map_err(|e| ServerError::Render {
                message: e.to_string(),
            })
        }
        ContentFormat::Html => Ok(html::render(document)),
    }
}

/// Run the delivery pipeline for one request
///
/// `kind` is the document `build` produces, so `HEAD` can answer with the
/// same headers as `GET`. `fingerprint` identifies the logical response;
/// requests without one get no `ETag` and are never answered with `304`.
pub async fn deliver<F, Fut>(
    state: &ServerState,
    ctx: &RequestContext,
    endpoint: &'static str,
    kind: DocumentKind,
    fingerprint: Option<ContentFingerprint>,
    build: F,
) -> Response
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ServerResult<Document>>,
{
    let format = match ctx.format() {
        Ok(format) => format,
        Err(e) => return reject(endpoint, e),
    };

    if ctx.is_head() {
        metrics::record_short_circuit("head");
        metrics::inc_requests(endpoint, "head");
        let response = ([(header::CONTENT_TYPE, media_type(kind, format))], ()).into_response();
        return with_etag(response, fingerprint.as_ref());
    }

    if let (Some(fp), Some(header_value)) = (fingerprint.as_ref(), ctx.if_none_match())
        && fp.matches_if_none_match(header_value)
    {
        debug!(endpoint, etag = %fp, "fingerprint matched, not modified");
        metrics::record_short_circuit("not_modified");
        metrics::inc_requests(endpoint, "not_modified");
        return with_etag(StatusCode::NOT_MODIFIED.into_response(), Some(fp));
    }

    let started = Instant::now();
    let built = build().await;
    metrics::observe_query_duration(
        endpoint,
        if built.is_ok() { "ok" } else { "error" },
        started.elapsed().as_secs_f64(),
    );

    let result = built.and_then(|document| {
        if document.kind() != kind {
            return Err(ServerError::Render {
                message: format!(
                    "built a {} document for a {} response",
                    document.kind().as_str(),
                    kind.as_str()
                ),
            });
        }
        let body = render(state, &document, format)?;
        Ok((media_type(kind, format), body))
    });
    match result {
        Ok((content_type, body)) => {
            metrics::inc_requests(endpoint, "ok");
            let response = ([(header::CONTENT_TYPE, content_type)], body).into_response();
            with_etag(response, fingerprint.as_ref())
        }
        Err(e) => reject(endpoint, e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use axum::http::Method;
    use feature_providers::{MemorySource, SourceBackend};
    use feature_query::{EphemeralStore, PagingConfig, QueryOrchestrator};
    use shared_types::Feature;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{
        config::ServerConfig,
        document::{ConformanceDeclaration, LandingPage, Link, SingleFeatureResult},
        schema::SchemaRegistry,
    };

    fn state() -> ServerState {
        let orchestrator = QueryOrchestrator::new(
            Arc::new(SourceBackend::from(MemorySource::new())),
            Arc::new(EphemeralStore::new()),
            PagingConfig::default(),
        );
        ServerState::new(
            ServerConfig::for_testing(),
            Arc::new(orchestrator),
            Arc::new(SchemaRegistry::new().unwrap()),
            CancellationToken::new(),
        )
    }

    fn ctx(method: Method) -> RequestContext {
        RequestContext::new(method, ContentFormat::Json, "http://localhost", vec![])
    }

    #[tokio::test]
    async fn head_never_builds() {
        let built = AtomicBool::new(false);
        let fp = ContentFingerprint::of_parts("conformance", [""; 0]);
        let build = || async {
            built.store(true, Ordering::SeqCst);
            Ok::<_, ServerError>(Document::Conformance(ConformanceDeclaration::default()))
        };
        let response = deliver(
            &state(),
            &ctx(Method::HEAD),
            "conformance",
            DocumentKind::Conformance,
            Some(fp.clone()),
            build,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ETAG], fp.etag().as_str());
        assert!(!built.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn head_and_get_share_content_type() {
        let fp = ContentFingerprint::for_feature("roads", 1);
        let build = || async {
            Ok::<_, ServerError>(Document::Feature(Box::new(SingleFeatureResult {
                feature: Feature::new("roads", 1),
                self_link: Link::new(
                    "http://localhost/collections/roads/items/1",
                    "self",
                    GEOJSON_CONTENT_TYPE,
                ),
                collection_link: Link::new(
                    "http://localhost/collections/roads",
                    "collection",
                    "application/json",
                ),
                alternate: vec![],
            })))
        };
        let state = state();

        let get = deliver(
            &state,
            &ctx(Method::GET),
            "feature",
            DocumentKind::Feature,
            Some(fp.clone()),
            build,
        )
        .await;
        let head = deliver(
            &state,
            &ctx(Method::HEAD),
            "feature",
            DocumentKind::Feature,
            Some(fp),
            build,
        )
        .await;

        assert_eq!(get.status(), StatusCode::OK);
        assert_eq!(head.headers()[header::CONTENT_TYPE], GEOJSON_CONTENT_TYPE);
        assert_eq!(head.headers()[header::CONTENT_TYPE], get.headers()[header::CONTENT_TYPE]);
        assert_eq!(head.headers()[header::ETAG], get.headers()[header::ETAG]);
    }

    #[tokio::test]
    async fn invalid_document_is_a_server_error() {
        let build = || async {
            Ok::<_, ServerError>(Document::Landing(LandingPage {
                title: "t".into(),
                description: String::new(),
                links: vec![Link::new("", "self", "application/json")],
            }))
        };
        let response = deliver(
            &state(),
            &ctx(Method::GET),
            "landing",
            DocumentKind::Landing,
            None,
            build,
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn feature_documents_are_geojson() {
        assert_eq!(
            media_type(DocumentKind::FeatureCollection, ContentFormat::Json),
            "application/geo+json"
        );
        assert_eq!(
            media_type(DocumentKind::Collections, ContentFormat::Json),
            "application/json"
        );
        assert_eq!(
            media_type(DocumentKind::Feature, ContentFormat::Html),
            "text/html; charset=utf-8"
        );
    }
}
