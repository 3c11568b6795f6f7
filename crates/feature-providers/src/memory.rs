// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory feature source

use std::{collections::BTreeMap, sync::RwLock};

use feature_source::{FeatureIter, FeatureSource, SourceError};
use shared_types::{Extent, Feature};
use tracing::trace;

/// Feature source holding its collections in memory
///
/// Collections can be added while the source is shared, which makes it a
/// stand-in for a live backend in tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    collections: RwLock<BTreeMap<String, Vec<Feature>>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder variant of [`MemorySource::insert_collection`]
    #[must_use]
    pub fn with_collection(self, name: &str, features: Vec<Feature>) -> Self {
        self.insert_collection(name, features);
        self
    }

    /// Add or replace a collection; every feature is re-homed into `name`
    pub fn insert_collection(&self, name: &str, features: Vec<Feature>) {
        let features = features
            .into_iter()
            .map(|mut f| {
                f.collection = name.to_string();
                f
            })
            .collect();
        // A poisoned lock only means a writer panicked mid-insert; the map is still usable
        let mut guard = match self.collections.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(name.to_string(), features);
    }

    fn snapshot(&self, collection: &str) -> Result<Vec<Feature>, SourceError> {
        let guard = self
            .collections
            .read()
            .map_err(|e| SourceError::unavailable(format!("memory source lock poisoned: {e}")))?;
        guard
            .get(collection)
            .cloned()
            .ok_or_else(|| SourceError::CollectionNotFound {
                collection: collection.to_string(),
            })
    }
}

/// Features without coordinates are never excluded by extent
pub(crate) fn within_extent(feature: &Feature, extent: &Extent) -> bool {
    Extent::of_geometry(&feature.geometry).is_none_or(|bounds| bounds.intersects(extent))
}

impl FeatureSource for MemorySource {
    async fn collection_names(&self) -> Result<Vec<String>, SourceError> {
        let guard = self
            .collections
            .read()
            .map_err(|e| SourceError::unavailable(format!("memory source lock poisoned: {e}")))?;
        Ok(guard.keys().cloned().collect())
    }

    async fn tile_features(
        &self,
        collection: &str,
        extent: &Extent,
    ) -> Result<FeatureIter, SourceError> {
        let features = self.snapshot(collection)?;
        trace!(collection, count = features.len(), "serving features from memory");
        let extent = *extent;
        Ok(Box::new(
            features
                .into_iter()
                .filter(move |f| within_extent(f, &extent))
                .map(Ok),
        ))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn roads() -> Vec<Feature> {
        vec![
            Feature::new("ignored", 1)
                .with_geometry(json!({"type": "Point", "coordinates": [1.0, 1.0]}))
                .with_property("highway", "secondary"),
            Feature::new("ignored", 2)
                .with_geometry(json!({"type": "Point", "coordinates": [50.0, 50.0]}))
                .with_property("highway", "primary"),
            Feature::new("ignored", 3).with_property("highway", "track"),
        ]
    }

    #[tokio::test]
    async fn features_are_rehomed_and_ordered() {
        let source = MemorySource::new().with_collection("roads", roads());
        let features: Vec<_> = source
            .tile_features("roads", &Extent::WORLD)
            .await
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(features.iter().map(|f| f.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(features.iter().all(|f| f.collection == "roads"));
    }

    #[tokio::test]
    async fn extent_excludes_distant_geometries() {
        let source = MemorySource::new().with_collection("roads", roads());
        let extent = Extent::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let ids: Vec<_> = source
            .tile_features("roads", &extent)
            .await
            .unwrap()
            .map(|f| f.unwrap().id)
            .collect();
        // feature 3 has no geometry and is kept
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn unknown_collection() {
        let source = MemorySource::new();
        let result = source.tile_features("roads", &Extent::WORLD).await;
        assert!(matches!(result, Err(SourceError::CollectionNotFound { .. })));
    }

    #[tokio::test]
    async fn collections_can_be_added_while_shared() {
        let source = MemorySource::new();
        assert!(source.collection_names().await.unwrap().is_empty());
        source.insert_collection("roads", roads());
        assert_eq!(source.collection_names().await.unwrap(), vec!["roads"]);
    }
}
