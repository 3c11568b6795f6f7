// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Source backend selection
//!
//! The server is generic over nothing: it holds one [`SourceBackend`] and the
//! enum forwards every call to the configured provider.

use feature_source::{FeatureIter, FeatureSource, HealthStatus, SourceError};
use shared_types::{Extent, Feature};

use crate::{GeoJsonDirectorySource, MemorySource};

/// The feature source a server instance reads from
#[derive(Debug)]
pub enum SourceBackend {
    /// GeoJSON files in a directory
    Directory(GeoJsonDirectorySource),
    /// Collections held in memory
    Memory(MemorySource),
}

impl From<GeoJsonDirectorySource> for SourceBackend {
    fn from(source: GeoJsonDirectorySource) -> Self {
        Self::Directory(source)
    }
}

impl From<MemorySource> for SourceBackend {
    fn from(source: MemorySource) -> Self {
        Self::Memory(source)
    }
}

impl FeatureSource for SourceBackend {
    async fn collection_names(&self) -> Result<Vec<String>, SourceError> {
        match self {
            Self::Directory(source) => source.collection_names().await,
            Self::Memory(source) => source.collection_names().await,
        }
    }

    async fn tile_features(
        &self,
        collection: &str,
        extent: &Extent,
    ) -> Result<FeatureIter, SourceError> {
        match self {
            Self::Directory(source) => source.tile_features(collection, extent).await,
            Self::Memory(source) => source.tile_features(collection, extent).await,
        }
    }

    async fn features_by_id(
        &self,
        collection: &str,
        ids: &[u64],
    ) -> Result<Vec<Feature>, SourceError> {
        match self {
            Self::Directory(source) => source.features_by_id(collection, ids).await,
            Self::Memory(source) => source.features_by_id(collection, ids).await,
        }
    }

    async fn health_check(&self) -> HealthStatus {
        match self {
            Self::Directory(source) => source.health_check().await,
            Self::Memory(source) => source.health_check().await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Directory(source) => source.name(),
            Self::Memory(source) => source.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_to_memory_source() {
        let backend = SourceBackend::from(MemorySource::new().with_collection(
            "roads",
            vec![Feature::new("roads", 1), Feature::new("roads", 2)],
        ));
        assert_eq!(backend.name(), "memory");
        assert_eq!(backend.collection_names().await.unwrap(), vec!["roads"]);
        let found = backend.features_by_id("roads", &[2]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
        assert_eq!(backend.health_check().await, HealthStatus::Up);
    }

    #[tokio::test]
    async fn empty_memory_source_is_degraded() {
        let backend = SourceBackend::from(MemorySource::new());
        assert!(matches!(
            backend.health_check().await,
            HealthStatus::Degraded { .. }
        ));
    }
}
