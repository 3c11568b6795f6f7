// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Feature source abstractions for tiled geospatial data providers
//!
//! This crate defines the capability the query core consumes: a provider that
//! lists its collections and yields the features of a collection covering a
//! bounding region.
//!
//! # Core Abstractions
//!
//! - **`FeatureSource` Trait**: async access to collections and features
//! - **`FeatureIter`**: pull-based, lazily evaluated feature sequence, so callers
//!   compose `filter`/`take`/`skip` instead of driving visitor callbacks
//! - **Health Check System**: [`HealthStatus`] derived from a collection listing
//! - **Error Handling**: [`SourceError`] separates "collection unknown" from
//!   genuine upstream failures

use std::{collections::HashSet, future::Future};

use shared_types::{Extent, Feature};
use thiserror::Error;
use tracing::warn;

pub mod health;

pub use health::HealthStatus;

/// Lazily evaluated sequence of features read from a source
pub type FeatureIter = Box<dyn Iterator<Item = Result<Feature, SourceError>> + Send>;

/// Generic trait for tiled feature sources
pub trait FeatureSource: Send + Sync {
    /// Names of every collection the source offers, in no particular order
    fn collection_names(&self) -> impl Future<Output = Result<Vec<String>, SourceError>> + Send;

    /// Features of `collection` intersecting `extent`
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::CollectionNotFound`] for unknown collections and
    /// [`SourceError::Unavailable`] when the backend cannot be read.
    fn tile_features(
        &self,
        collection: &str,
        extent: &Extent,
    ) -> impl Future<Output = Result<FeatureIter, SourceError>> + Send;

    /// Features of `collection` whose primary key is in `ids`
    ///
    /// The default implementation scans the full extent once and keeps the
    /// matching keys. Sources with a primary key index should override it.
    fn features_by_id(
        &self,
        collection: &str,
        ids: &[u64],
    ) -> impl Future<Output = Result<Vec<Feature>, SourceError>> + Send {
        async move {
            let wanted: HashSet<u64> = ids.iter().copied().collect();
            let features = self.tile_features(collection, &Extent::WORLD).await?;
            let mut found = Vec::with_capacity(wanted.len());
            for feature in features {
                let feature = feature?;
                if wanted.contains(&feature.id) {
                    found.push(feature);
                }
            }
            Ok(found)
        }
    }

    /// Check the health of this source
    ///
    /// A source that lists without error but offers no collection is degraded.
    /// The reason of a down source never carries the underlying error.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send {
        async move {
            match self.collection_names().await {
                Ok(names) if names.is_empty() => HealthStatus::Degraded {
                    reason: format!("{} offers no collections", self.name()),
                },
                Ok(_) => HealthStatus::Up,
                Err(e) => {
                    warn!(source = self.name(), error = %e, "feature source health check failed");
                    HealthStatus::Down {
                        reason: format!("{} unavailable", self.name()),
                    }
                }
            }
        }
    }

    /// Get the name/identifier of this source
    fn name(&self) -> &'static str;
}

/// Errors raised by feature sources
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SourceError {
    /// The backend could not be reached or read
    #[error("feature source unavailable: {message}")]
    Unavailable { message: String },

    /// The requested collection does not exist in this source
    #[error("collection '{collection}' not found in feature source")]
    CollectionNotFound { collection: String },

    /// The backend returned data that could not be turned into features
    #[error("invalid feature data in collection '{collection}': {message}")]
    InvalidData { collection: String, message: String },
}

impl SourceError {
    /// Create an unavailable error from anything displayable
    pub fn unavailable(message: impl ToString) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }
}
