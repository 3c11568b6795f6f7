// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Query error types

use feature_source::SourceError;
use thiserror::Error;

/// Errors raised while answering a feature query
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum QueryError {
    /// The request itself is malformed (filter syntax, page bounds, time values)
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// An ephemeral collection cannot take a name that is already in use
    #[error("collection name '{name}' is already in use")]
    DuplicateName { name: String },

    /// A caller supplied ephemeral collection name is not acceptable
    #[error("invalid collection name '{name}': {reason}")]
    InvalidCollectionName { name: String, reason: String },

    /// No feature with this primary key in the collection
    #[error("feature {id} not found in collection '{collection}'")]
    FeatureNotFound { collection: String, id: u64 },

    /// No source or ephemeral collection with this name
    #[error("collection '{collection}' not found")]
    CollectionNotFound { collection: String },

    /// The feature source failed
    #[error("feature source unavailable")]
    SourceUnavailable {
        #[source]
        source: SourceError,
    },
}

impl QueryError {
    /// Create an invalid request error from anything displayable
    pub fn invalid_request(message: impl ToString) -> Self {
        Self::InvalidRequest {
            message: message.to_string(),
        }
    }

    /// Whether the caller, not the service, is at fault
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::SourceUnavailable { .. })
    }
}

impl From<SourceError> for QueryError {
    fn from(source: SourceError) -> Self {
        match source {
            SourceError::CollectionNotFound { collection } => Self::CollectionNotFound { collection },
            source => Self::SourceUnavailable { source },
        }
    }
}
