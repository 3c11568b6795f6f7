// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Feature identity and attribute types

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property keys that carry temporal metadata instead of plain attributes
pub const TIME_PROPERTY_KEYS: [&str; 3] = ["start_time", "stop_time", "timestamp"];

/// Identity of a feature: the collection it belongs to and its primary key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId {
    /// Name of the source collection holding the feature
    pub collection: String,
    /// Primary key of the feature within its collection
    pub pk: u64,
}

impl FeatureId {
    /// Create a new feature identity
    pub fn new(collection: impl Into<String>, pk: u64) -> Self {
        Self {
            collection: collection.into(),
            pk,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.pk)
    }
}

/// A single property value as delivered by a feature source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean attribute
    Boolean(bool),
    /// Signed integer attribute
    Integer(i64),
    /// Floating point attribute
    Float(f64),
    /// Text attribute
    String(String),
    /// Anything else (null, arrays, nested objects), kept verbatim
    Json(Value),
}

impl PropertyValue {
    /// The text content if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value equals the filter text.
    ///
    /// Strings compare exactly; other scalars compare through their canonical
    /// text rendering, so `lanes=2` matches an integer property `2`.
    pub fn matches_text(&self, expected: &str) -> bool {
        match self {
            Self::String(s) => s == expected,
            Self::Boolean(b) => expected == if *b { "true" } else { "false" },
            Self::Integer(i) => expected == i.to_string(),
            Self::Float(x) => expected == x.to_string(),
            Self::Json(_) => false,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => Self::Boolean(b),
            Value::String(s) => Self::String(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(x) = n.as_f64() {
                    Self::Float(x)
                } else {
                    Self::Json(Value::Number(n))
                }
            }
            other => Self::Json(other),
        }
    }
}

/// One geospatial record
///
/// Geometry is kept as an opaque GeoJSON geometry object; the query core never
/// interprets it. Properties are kept in a sorted map so serialization and
/// fingerprints are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Source collection the feature was read from
    pub collection: String,
    /// Primary key within the collection
    pub id: u64,
    /// GeoJSON geometry object (or `null`)
    pub geometry: Value,
    /// Attribute map
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Feature {
    /// Create a feature without geometry or properties
    pub fn new(collection: impl Into<String>, id: u64) -> Self {
        Self {
            collection: collection.into(),
            id,
            geometry: Value::Null,
            properties: BTreeMap::new(),
        }
    }

    /// Set the geometry
    #[must_use]
    pub fn with_geometry(mut self, geometry: Value) -> Self {
        self.geometry = geometry;
        self
    }

    /// Add or replace a property
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Identity of this feature
    pub fn feature_id(&self) -> FeatureId {
        FeatureId::new(self.collection.clone(), self.id)
    }

    /// Look up a property
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}
