// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Query orchestration
//!
//! Answers the three query shapes the API serves: one feature, one page of a
//! filtered collection, and materialization of a filtered multi-collection
//! set. Collections are always visited in sorted-name order and features keep
//! the order the source yields them in, so repeated identical requests page
//! through identical sequences.

use std::sync::Arc;

use feature_source::FeatureSource;
use shared_types::{Extent, Feature, FeatureId};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{CollectionSource, EphemeralStore, PropertyFilter, QueryError};

/// Default page size when a request names none
pub const DEFAULT_LIMIT: u64 = 10;

/// Largest page size a request may ask for
pub const MAX_LIMIT: u64 = 1000;

/// Page size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Page size used when a request names none
    pub default_limit: u64,
    /// Upper bound for requested page sizes
    pub max_limit: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

/// Resolved `[start, stop)` slice of a result sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based page number
    pub page: u64,
    /// Page size
    pub limit: u64,
    /// First index, inclusive
    pub start: u64,
    /// Last index, exclusive
    pub stop: u64,
}

impl PagingConfig {
    /// Resolve request paging parameters
    ///
    /// The limit defaults to `default_limit` and is clamped to `max_limit`.
    pub fn window(&self, limit: Option<u64>, page: Option<u64>) -> Result<PageWindow, QueryError> {
        let limit = match limit {
            Some(0) => return Err(QueryError::invalid_request("limit must be at least 1")),
            Some(limit) => limit.min(self.max_limit),
            None => self.default_limit,
        };
        let page = page.unwrap_or(0);
        let start = limit
            .checked_mul(page)
            .ok_or_else(|| QueryError::invalid_request(format!("page {page} is out of range")))?;
        let stop = start
            .checked_add(limit)
            .ok_or_else(|| QueryError::invalid_request(format!("page {page} is out of range")))?;
        Ok(PageWindow {
            page,
            limit,
            start,
            stop,
        })
    }
}

/// Where a collection comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Provided by the feature source
    Source,
    /// Materialized from a filter request
    Ephemeral,
}

/// A collection known to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// Origin of the collection
    pub kind: CollectionKind,
}

/// One page of a filtered collection
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePage {
    /// Features in the page, in stable order
    pub features: Vec<Feature>,
    /// Number of features matching the request across all pages
    pub total_matched: u64,
}

/// Outcome of materializing a filtered set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedSet {
    /// Name the set was stored under
    pub collection_name: String,
    /// Number of member features
    pub matched_count: u64,
}

/// Query entry point shared by all request handlers
#[derive(Debug)]
pub struct QueryOrchestrator<S> {
    collections: CollectionSource<S>,
    paging: PagingConfig,
}

impl<S: FeatureSource> QueryOrchestrator<S> {
    /// Create an orchestrator over a source and an ephemeral store
    pub fn new(source: Arc<S>, store: Arc<EphemeralStore>, paging: PagingConfig) -> Self {
        Self {
            collections: CollectionSource::new(source, store),
            paging,
        }
    }

    /// The collection source adapter
    pub fn collections(&self) -> &CollectionSource<S> {
        &self.collections
    }

    /// Paging limits
    pub fn paging(&self) -> &PagingConfig {
        &self.paging
    }

    /// Every source and ephemeral collection, sorted by name
    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>, QueryError> {
        let sources = self.collections.list_collection_names().await?;
        let ephemeral = self.collections.store().names();
        let mut all: Vec<CollectionInfo> = sources
            .into_iter()
            .map(|name| CollectionInfo {
                name,
                kind: CollectionKind::Source,
            })
            .chain(ephemeral.into_iter().map(|name| CollectionInfo {
                name,
                kind: CollectionKind::Ephemeral,
            }))
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    /// Look up one collection by name
    pub async fn collection(&self, name: &str) -> Result<CollectionInfo, QueryError> {
        if self.collections.store().contains(name) {
            return Ok(CollectionInfo {
                name: name.to_string(),
                kind: CollectionKind::Ephemeral,
            });
        }
        let sources = self.collections.list_collection_names().await?;
        if sources.binary_search_by(|n| n.as_str().cmp(name)).is_ok() {
            Ok(CollectionInfo {
                name: name.to_string(),
                kind: CollectionKind::Source,
            })
        } else {
            Err(QueryError::CollectionNotFound {
                collection: name.to_string(),
            })
        }
    }

    /// One feature by primary key
    pub async fn single_feature(&self, collection: &str, id: u64) -> Result<Feature, QueryError> {
        let not_found = || QueryError::FeatureNotFound {
            collection: collection.to_string(),
            id,
        };

        let wanted: Vec<FeatureId> = match self.collections.ephemeral_members(collection) {
            Some(members) => members.iter().filter(|m| m.pk == id).cloned().collect(),
            None => vec![FeatureId::new(collection, id)],
        };
        if wanted.is_empty() {
            return Err(not_found());
        }

        self.collections
            .fetch_features_by_identity(&wanted)
            .await?
            .into_iter()
            .next()
            .ok_or_else(not_found)
    }

    /// The `[start, stop)` slice of the filtered collection
    ///
    /// A window past the last match yields an empty page; `stop < start` is a
    /// caller error.
    pub async fn feature_page(
        &self,
        collection: &str,
        filter: &PropertyFilter,
        extent: Option<&Extent>,
        start: u64,
        stop: u64,
    ) -> Result<FeaturePage, QueryError> {
        if stop < start {
            return Err(QueryError::invalid_request(format!(
                "page window stop ({stop}) precedes start ({start})"
            )));
        }

        let matched = self
            .collections
            .fetch_collection_features(collection, Some(filter), extent)
            .await?;
        let total_matched = matched.len() as u64;
        let first = usize::try_from(start.min(total_matched)).unwrap_or(matched.len());
        let last = usize::try_from(stop.min(total_matched)).unwrap_or(matched.len());

        let features: Vec<Feature> = matched.into_iter().skip(first).take(last - first).collect();
        debug!(
            collection,
            start,
            stop,
            total_matched,
            returned = features.len(),
            "served feature page"
        );
        Ok(FeaturePage {
            features,
            total_matched,
        })
    }

    /// Filter `collections` (all source collections when empty) and store the
    /// matching identities as a new ephemeral collection
    ///
    /// A `name` of `None` generates a fresh `filtered-<uuid>` name.
    pub async fn materialize_filtered_set(
        &self,
        collections: &[String],
        filter: &PropertyFilter,
        extent: Option<&Extent>,
        name: Option<&str>,
    ) -> Result<MaterializedSet, QueryError> {
        let name = match name {
            Some(name) => {
                EphemeralStore::validate_name(name)?;
                name.to_string()
            }
            None => format!("filtered-{}", Uuid::new_v4().simple()),
        };

        let mut candidates = if collections.is_empty() {
            self.collections.list_collection_names().await?
        } else {
            collections.to_vec()
        };
        candidates.sort_unstable();
        candidates.dedup();

        let mut members: Vec<FeatureId> = Vec::new();
        for collection in &candidates {
            let features = self
                .collections
                .fetch_collection_features(collection, Some(filter), extent)
                .await?;
            members.extend(features.iter().map(Feature::feature_id));
        }

        let matched_count = members.len() as u64;
        let collection_name = self.collections.materialize(&name, members).await?;
        info!(
            name = %collection_name,
            collections = candidates.len(),
            matched = matched_count,
            "materialized filtered set"
        );
        Ok(MaterializedSet {
            collection_name,
            matched_count,
        })
    }
}
