// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Collection source adapter
//!
//! The query-side view of a [`FeatureSource`]: sorted collection listings,
//! filtered collection reads and identity lookups. Names of ephemeral
//! collections resolve through the [`EphemeralStore`].

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use feature_source::{FeatureSource, SourceError};
use shared_types::{Extent, Feature, FeatureId};
use tracing::debug;

use crate::{EphemeralStore, PropertyFilter, QueryError};

/// Feature source combined with the ephemeral collections built on top of it
#[derive(Debug)]
pub struct CollectionSource<S> {
    source: Arc<S>,
    store: Arc<EphemeralStore>,
}

impl<S> Clone for CollectionSource<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
        }
    }
}

fn unavailable(source: SourceError) -> QueryError {
    QueryError::SourceUnavailable { source }
}

impl<S: FeatureSource> CollectionSource<S> {
    /// Combine a source with an ephemeral store
    pub fn new(source: Arc<S>, store: Arc<EphemeralStore>) -> Self {
        Self { source, store }
    }

    /// The wrapped feature source
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The ephemeral collection store
    pub fn store(&self) -> &Arc<EphemeralStore> {
        &self.store
    }

    /// Source collection names, sorted; asks the source on every call
    pub async fn list_collection_names(&self) -> Result<Vec<String>, QueryError> {
        let mut names = self.source.collection_names().await.map_err(unavailable)?;
        names.sort_unstable();
        names.dedup();
        Ok(names)
    }

    /// Features of a source or ephemeral collection
    ///
    /// Ephemeral collections are returned as materialized; `filter` and
    /// `extent` only apply to source collections, where features are filtered
    /// one by one as the source yields them. Unknown collections are empty.
    pub async fn fetch_collection_features(
        &self,
        name: &str,
        filter: Option<&PropertyFilter>,
        extent: Option<&Extent>,
    ) -> Result<Vec<Feature>, QueryError> {
        if let Some(features) = self.read_ephemeral(name).await? {
            return Ok(features);
        }

        let extent = extent.copied().unwrap_or(Extent::WORLD);
        let iter = match self.source.tile_features(name, &extent).await {
            Ok(iter) => iter,
            Err(SourceError::CollectionNotFound { .. }) => {
                debug!(collection = name, "unknown collection, nothing to read");
                return Ok(Vec::new());
            }
            Err(e) => return Err(unavailable(e)),
        };

        let mut features = Vec::new();
        for feature in iter {
            let feature = feature.map_err(unavailable)?;
            if filter.is_none_or(|f| f.matches(&feature)) {
                features.push(feature);
            }
        }
        debug!(collection = name, matched = features.len(), "read collection");
        Ok(features)
    }

    /// Features for explicit identities, in request order
    ///
    /// Each implicated collection is read once. Identities that cannot be
    /// found are left out of the result.
    pub async fn fetch_features_by_identity(
        &self,
        ids: &[FeatureId],
    ) -> Result<Vec<Feature>, QueryError> {
        let mut by_collection: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
        for id in ids {
            by_collection
                .entry(id.collection.as_str())
                .or_default()
                .push(id.pk);
        }

        let mut found: HashMap<FeatureId, Feature> = HashMap::with_capacity(ids.len());
        for (collection, pks) in by_collection {
            match self.source.features_by_id(collection, &pks).await {
                Ok(features) => {
                    found.extend(features.into_iter().map(|f| (f.feature_id(), f)));
                }
                Err(SourceError::CollectionNotFound { .. }) => {
                    debug!(collection, "collection of requested features no longer exists");
                }
                Err(e) => return Err(unavailable(e)),
            }
        }

        let features: Vec<Feature> = ids.iter().filter_map(|id| found.get(id).cloned()).collect();
        if features.len() < ids.len() {
            debug!(
                requested = ids.len(),
                found = features.len(),
                "omitting features that could not be found"
            );
        }
        Ok(features)
    }

    /// Features of an ephemeral collection, or `None` if `name` is not one
    pub async fn read_ephemeral(&self, name: &str) -> Result<Option<Vec<Feature>>, QueryError> {
        let Some(members) = self.store.members(name) else {
            return Ok(None);
        };
        // the store lock is released before the source is read
        self.fetch_features_by_identity(&members).await.map(Some)
    }

    /// Identities held by an ephemeral collection, refreshing its access time
    pub fn ephemeral_members(&self, name: &str) -> Option<Arc<[FeatureId]>> {
        self.store.members(name)
    }

    /// Store `members` as a new ephemeral collection called `name`
    ///
    /// Fails when `name` is already a source or ephemeral collection.
    pub async fn materialize(&self, name: &str, members: Vec<FeatureId>) -> Result<String, QueryError> {
        EphemeralStore::validate_name(name)?;
        let source_names = self.list_collection_names().await?;
        if source_names.binary_search_by(|n| n.as_str().cmp(name)).is_ok() {
            return Err(QueryError::DuplicateName {
                name: name.to_string(),
            });
        }
        self.store.insert_new(name, members)?;
        Ok(name.to_string())
    }
}
