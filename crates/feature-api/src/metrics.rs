// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics module
//!
//! Provides global metrics using the default Prometheus registry via macros and
//! an Axum-compatible metrics handler.

use std::sync::LazyLock;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
};
use tracing::error;

use crate::state::ServerState;

/// Total number of API requests, labeled by endpoint and outcome.
pub static REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "feature_api_requests_total",
        "Total number of API requests, labeled by endpoint and outcome",
        &["endpoint", "outcome"]
    )
    .expect("Failed to create feature_api_requests_total counter vec")
});

/// Histogram for feature query durations in seconds.
pub static QUERY_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "feature_api_query_duration",
        "Feature query durations in seconds",
        &["endpoint", "result"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create feature query duration histogram")
});

/// Requests answered from the fingerprint alone
pub static CONDITIONAL_SHORT_CIRCUITS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "feature_api_conditional_short_circuits_total",
        "Requests answered without running a query",
        &["kind"]
    )
    .expect("Failed to create conditional short circuit counter vec")
});

/// Responses that failed their own schema
pub static SCHEMA_VALIDATION_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "feature_api_schema_validation_failures_total",
        "Structured responses that did not match their declared schema"
    )
    .expect("Failed to create schema validation failure counter")
});

/// Ephemeral collection count
pub static EPHEMERAL_COLLECTIONS: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!(
        "feature_api_ephemeral_collections",
        "Current number of ephemeral collections"
    )
    .expect("Failed to create ephemeral collection gauge")
});

/// Count a finished request
pub fn inc_requests(endpoint: &str, outcome: &str) {
    REQUESTS.with_label_values(&[endpoint, outcome]).inc();
}

/// Observe the duration of a feature query
///
/// # Arguments
/// * `endpoint` - Endpoint label
/// * `result` - `ok` or `error`
/// * `duration_secs` - The duration of the query in seconds
pub fn observe_query_duration(endpoint: &str, result: &str, duration_secs: f64) {
    QUERY_DURATION
        .with_label_values(&[endpoint, result])
        .observe(duration_secs);
}

/// Record a `HEAD` or `If-None-Match` short circuit
pub fn record_short_circuit(kind: &str) {
    CONDITIONAL_SHORT_CIRCUITS.with_label_values(&[kind]).inc();
}

/// Record a schema validation failure
pub fn record_schema_failure() {
    SCHEMA_VALIDATION_FAILURES.inc();
}

/// Axum handler that exports metrics in Prometheus text format
pub async fn metrics_handler(State(state): State<ServerState>) -> Response {
    EPHEMERAL_COLLECTIONS.set(i64::try_from(state.ephemeral_count()).unwrap_or(i64::MAX));

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => ([(header::CONTENT_TYPE, encoder.format_type().to_string())], body).into_response(),
        Err(e) => {
            error!(error = %e, "metrics buffer is not UTF-8");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
