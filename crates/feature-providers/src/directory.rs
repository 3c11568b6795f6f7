// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! GeoJSON directory feature source
//!
//! Every `<name>.geojson` file in the data directory is one collection holding
//! a GeoJSON `FeatureCollection`. The directory is rescanned on every call, so
//! files added or removed at runtime show up without a restart.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use feature_source::{FeatureIter, FeatureSource, SourceError};
use serde_json::Value;
use shared_types::{Extent, Feature, PropertyValue};
use tracing::{debug, warn};

use crate::memory::within_extent;

const GEOJSON_EXTENSION: &str = "geojson";

/// Directories searched, in priority order, when no data directory is configured
const DEFAULT_DATA_DIRS: [&str; 3] = [".", "data", "test_data"];

/// Feature source reading GeoJSON files from a directory
#[derive(Debug, Clone)]
pub struct GeoJsonDirectorySource {
    data_dir: PathBuf,
}

impl GeoJsonDirectorySource {
    /// Create a source over `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory the collections are read from
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn entries(&self) -> Result<tokio::fs::ReadDir, SourceError> {
        tokio::fs::read_dir(&self.data_dir).await.map_err(|e| {
            SourceError::unavailable(format!(
                "cannot list {}: {e}",
                self.data_dir.display()
            ))
        })
    }

    /// File backing `collection`, matching the extension in any case
    async fn collection_path(&self, collection: &str) -> Result<Option<PathBuf>, SourceError> {
        let safe = !collection.is_empty()
            && !collection.starts_with('.')
            && !collection.contains(['/', '\\']);
        if !safe {
            return Ok(None);
        }

        let exact = self
            .data_dir
            .join(format!("{collection}.{GEOJSON_EXTENSION}"));
        if tokio::fs::try_exists(&exact).await.unwrap_or(false) {
            return Ok(Some(exact));
        }

        let mut entries = self.entries().await?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(SourceError::unavailable)?
        {
            let path = entry.path();
            if has_geojson_extension(&path)
                && path.file_stem().is_some_and(|stem| stem == collection)
            {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

/// First of `.`, `./data`, `./test_data` holding at least one GeoJSON file
pub fn default_data_dir() -> Option<PathBuf> {
    DEFAULT_DATA_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|dir| contains_geojson(dir))
}

fn contains_geojson(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(Result::ok)
            .any(|entry| has_geojson_extension(&entry.path()))
    })
}

fn has_geojson_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(GEOJSON_EXTENSION))
}

/// Convert one GeoJSON feature object; `position` is its 0-based index in the file
fn to_feature(collection: &str, position: usize, raw: Value) -> Result<Feature, SourceError> {
    let invalid = |message: String| SourceError::InvalidData {
        collection: collection.to_string(),
        message,
    };

    let Value::Object(mut object) = raw else {
        return Err(invalid(format!("feature #{position} is not an object")));
    };

    // Features without an integer id get their 1-based position as primary key
    let id = match object.get("id") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .unwrap_or(position as u64 + 1);

    let geometry = object.remove("geometry").unwrap_or(Value::Null);
    let properties = match object.remove("properties") {
        None | Some(Value::Null) => Default::default(),
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| (k, PropertyValue::from(v)))
            .collect(),
        Some(_) => {
            return Err(invalid(format!(
                "feature #{position} has non-object properties"
            )));
        }
    };

    Ok(Feature {
        collection: collection.to_string(),
        id,
        geometry,
        properties,
    })
}

impl FeatureSource for GeoJsonDirectorySource {
    async fn collection_names(&self) -> Result<Vec<String>, SourceError> {
        let mut entries = self.entries().await?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(SourceError::unavailable)?
        {
            let path = entry.path();
            if !has_geojson_extension(&path) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        debug!(dir = %self.data_dir.display(), count = names.len(), "listed collections");
        Ok(names)
    }

    async fn tile_features(
        &self,
        collection: &str,
        extent: &Extent,
    ) -> Result<FeatureIter, SourceError> {
        let not_found = || SourceError::CollectionNotFound {
            collection: collection.to_string(),
        };
        let path = self
            .collection_path(collection)
            .await?
            .ok_or_else(not_found)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read collection file");
                return Err(SourceError::unavailable(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        let document: Value =
            serde_json::from_slice(&bytes).map_err(|e| SourceError::InvalidData {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;
        let features = match document {
            Value::Object(mut object) => match object.remove("features") {
                Some(Value::Array(features)) => features,
                _ => {
                    return Err(SourceError::InvalidData {
                        collection: collection.to_string(),
                        message: "expected a FeatureCollection with a 'features' array"
                            .to_string(),
                    });
                }
            },
            _ => {
                return Err(SourceError::InvalidData {
                    collection: collection.to_string(),
                    message: "document is not a JSON object".to_string(),
                });
            }
        };

        let collection = collection.to_string();
        let extent = *extent;
        Ok(Box::new(
            features
                .into_iter()
                .enumerate()
                .map(move |(position, raw)| to_feature(&collection, position, raw))
                .filter(move |result| {
                    result
                        .as_ref()
                        .map_or(true, |feature| within_extent(feature, &extent))
                }),
        ))
    }

    fn name(&self) -> &'static str {
        "geojson-directory"
    }
}
