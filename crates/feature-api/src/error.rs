// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! This module provides the server error types and their HTTP mapping. Status
//! code and body are chosen together in [`ServerError::to_error_result`] before
//! anything is written.

use std::net::SocketAddr;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use feature_query::QueryError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Detail sent for every upstream source failure
const SOURCE_UNAVAILABLE_DETAIL: &str = "feature source unavailable";

/// Detail sent when a response fails its own schema
const SCHEMA_MISMATCH_DETAIL: &str = "response doesn't match schema";

/// Comprehensive error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Task join errors for async operations
    #[error("Task join error: {source}")]
    TaskJoin {
        /// Underlying tokio join error
        #[source]
        source: tokio::task::JoinError,
    },

    /// Malformed request parameters
    #[error("{message}")]
    BadRequest {
        /// What is wrong with the request
        message: String,
    },

    /// An explicitly requested representation is not offered
    #[error("unsupported format '{format}'")]
    UnsupportedFormat {
        /// The requested format
        format: String,
    },

    /// The response body the server produced violates its own schema
    #[error("{SCHEMA_MISMATCH_DETAIL}")]
    SchemaValidation {
        /// Document kind that failed validation
        document: &'static str,
        /// Validator messages
        errors: Vec<String>,
    },

    /// A response body could not be rendered
    #[error("Rendering failed: {message}")]
    Render {
        /// Error message
        message: String,
    },

    /// Query failures
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Whether an error is the caller's or the service's fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
}

/// Typed outbound form of an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ErrorResult {
    /// Human-readable detail
    pub detail: String,
    /// Error category
    pub status_category: StatusCategory,
}

/// JSON body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable detail
    pub detail: String,
    /// HTTP status code
    pub status: u16,
}

impl ServerError {
    /// Create a bad request error from anything displayable
    pub fn bad_request(message: impl ToString) -> Self {
        Self::BadRequest {
            message: message.to_string(),
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config { .. }
            | Self::Bind { .. }
            | Self::Startup { .. }
            | Self::Shutdown { .. }
            | Self::TaskJoin { .. }
            | Self::SchemaValidation { .. }
            | Self::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest { .. } | Self::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
            Self::Query(query) => match query {
                QueryError::InvalidRequest { .. } | QueryError::InvalidCollectionName { .. } => {
                    StatusCode::BAD_REQUEST
                }
                QueryError::DuplicateName { .. } => StatusCode::CONFLICT,
                QueryError::FeatureNotFound { .. } | QueryError::CollectionNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                QueryError::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    /// Status plus typed result, decided together
    ///
    /// Server-side failures never expose internal detail.
    pub fn to_error_result(&self) -> (StatusCode, ErrorResult) {
        let status = self.status_code();
        let (detail, status_category) = if status.is_client_error() {
            (self.to_string(), StatusCategory::ClientError)
        } else {
            let detail = match self {
                Self::Query(QueryError::SourceUnavailable { .. }) => SOURCE_UNAVAILABLE_DETAIL,
                Self::SchemaValidation { .. } => SCHEMA_MISMATCH_DETAIL,
                _ => "internal server error",
            };
            (detail.to_string(), StatusCategory::ServerError)
        };
        (
            status,
            ErrorResult {
                detail,
                status_category,
            },
        )
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, result) = self.to_error_result();
        match result.status_category {
            StatusCategory::ServerError => match &self {
                Self::SchemaValidation { document, errors } => {
                    error!(document, errors = ?errors, "response failed schema validation");
                }
                Self::Query(QueryError::SourceUnavailable { source }) => {
                    error!(error = %source, "request failed, feature source unavailable");
                }
                other => error!(error = %other, "request failed"),
            },
            StatusCategory::ClientError => warn!(status = status.as_u16(), detail = %result.detail, "rejected request"),
        }

        let body = ErrorBody {
            detail: result.detail,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

/// Convenient From implementations for common async error types
impl From<tokio::task::JoinError> for ServerError {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TaskJoin { source }
    }
}

#[cfg(test)]
mod tests {
    use feature_source::SourceError;

    use super::*;

    #[test]
    fn query_errors_map_to_statuses() {
        let cases = [
            (QueryError::invalid_request("bad bbox"), StatusCode::BAD_REQUEST),
            (
                QueryError::DuplicateName {
                    name: "subset".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                QueryError::FeatureNotFound {
                    collection: "roads".into(),
                    id: 3,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                QueryError::from(SourceError::unavailable("db down")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ServerError::from(error).status_code(), status);
        }
    }

    #[test]
    fn source_failures_are_generic() {
        let error = ServerError::from(QueryError::from(SourceError::unavailable(
            "cannot read /srv/secret/path.geojson",
        )));
        let (status, result) = error.to_error_result();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(result.detail, "feature source unavailable");
        assert_eq!(result.status_category, StatusCategory::ServerError);
    }

    #[test]
    fn schema_failures_are_server_errors() {
        let error = ServerError::SchemaValidation {
            document: "feature_collection",
            errors: vec!["/features: expected array".into()],
        };
        let (status, result) = error.to_error_result();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(result.detail, "response doesn't match schema");
    }

    #[test]
    fn client_errors_keep_detail() {
        let (status, result) = ServerError::UnsupportedFormat {
            format: "xml".into(),
        }
        .to_error_result();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(result.detail, "unsupported format 'xml'");
        assert_eq!(result.status_category, StatusCategory::ClientError);
    }
}
