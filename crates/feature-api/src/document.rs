// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Response documents
//!
//! Every successful response body is one [`Document`] variant. Serializers
//! and renderers match on it exhaustively.

use std::collections::BTreeMap;

use feature_query::CollectionKind;
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;
use shared_types::{Feature, PropertyValue};
use utoipa::ToSchema;

use crate::error::{ServerError, ServerResult};

/// OGC API Features conformance classes served
pub const CONFORMANCE_CLASSES: [&str; 4] = [
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/core",
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/oas30",
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/geojson",
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/html",
];

/// A hypermedia link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Link {
    /// Target URL
    pub href: String,
    /// Relation type
    pub rel: String,
    /// Media type of the target
    #[serde(rename = "type")]
    pub media_type: String,
    /// Optional label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    /// Create an untitled link
    pub fn new(href: impl Into<String>, rel: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            media_type: media_type.into(),
            title: None,
        }
    }

    /// Attach a title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Service landing page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LandingPage {
    /// Service title
    pub title: String,
    /// Service description
    pub description: String,
    /// Links to the API definition, conformance and collections
    pub links: Vec<Link>,
}

/// Conformance classes implemented by the service
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConformanceDeclaration {
    /// Conformance class URIs
    #[serde(rename = "conformsTo")]
    pub conforms_to: Vec<String>,
}

impl Default for ConformanceDeclaration {
    fn default() -> Self {
        Self {
            conforms_to: CONFORMANCE_CLASSES.iter().map(ToString::to_string).collect(),
        }
    }
}

/// One collection as listed by the service
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectionSummary {
    /// Collection name
    pub name: String,
    /// Human-readable title
    pub title: String,
    /// `source` or `ephemeral`
    pub kind: &'static str,
    /// Links to the collection and its items
    pub links: Vec<Link>,
}

impl CollectionSummary {
    /// Label for a collection kind
    pub fn kind_label(kind: CollectionKind) -> &'static str {
        match kind {
            CollectionKind::Source => "source",
            CollectionKind::Ephemeral => "ephemeral",
        }
    }
}

/// All collections
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectionList {
    /// Collections sorted by name
    pub collections: Vec<CollectionSummary>,
    /// Self and alternate links
    pub links: Vec<Link>,
}

/// GeoJSON view of a feature
#[derive(Serialize)]
struct GeoJsonFeature<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: u64,
    collection: &'a str,
    geometry: &'a Value,
    properties: &'a BTreeMap<String, PropertyValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    links: Vec<&'a Link>,
}

impl<'a> GeoJsonFeature<'a> {
    fn new(feature: &'a Feature, links: Vec<&'a Link>) -> Self {
        Self {
            kind: "Feature",
            id: feature.id,
            collection: &feature.collection,
            geometry: &feature.geometry,
            properties: &feature.properties,
            links,
        }
    }
}

/// One feature with its links
#[derive(Debug, Clone, ToSchema)]
pub struct SingleFeatureResult {
    /// The feature
    #[schema(value_type = Object)]
    pub feature: Feature,
    /// Link to this feature
    pub self_link: Link,
    /// Link to the collection the feature was requested from
    pub collection_link: Link,
    /// This feature in other formats
    pub alternate: Vec<Link>,
}

impl SingleFeatureResult {
    fn links(&self) -> Vec<&Link> {
        std::iter::once(&self.self_link)
            .chain(self.alternate.iter())
            .chain(std::iter::once(&self.collection_link))
            .collect()
    }
}

impl Serialize for SingleFeatureResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GeoJsonFeature::new(&self.feature, self.links()).serialize(serializer)
    }
}

/// One page of a collection
#[derive(Debug, Clone, ToSchema)]
pub struct FeatureCollectionResult {
    /// Features in the page
    #[schema(value_type = Vec<Object>)]
    pub features: Vec<Feature>,
    /// Link to this page
    pub self_link: Link,
    /// Previous page, absent on the first
    pub prev_link: Option<Link>,
    /// Next page, present while more features match
    pub next_link: Option<Link>,
    /// This page in other formats
    pub alternate: Vec<Link>,
    /// Features matching the request across all pages
    pub total_matched: u64,
    /// Features in this page
    pub returned: u64,
}

impl FeatureCollectionResult {
    /// All links in a stable order
    pub fn links(&self) -> Vec<&Link> {
        std::iter::once(&self.self_link)
            .chain(self.alternate.iter())
            .chain(self.prev_link.iter())
            .chain(self.next_link.iter())
            .collect()
    }
}

impl Serialize for FeatureCollectionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let features: Vec<GeoJsonFeature<'_>> = self
            .features
            .iter()
            .map(|f| GeoJsonFeature::new(f, Vec::new()))
            .collect();
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("type", "FeatureCollection")?;
        map.serialize_entry("features", &features)?;
        map.serialize_entry("links", &self.links())?;
        map.serialize_entry("numberMatched", &self.total_matched)?;
        map.serialize_entry("numberReturned", &self.returned)?;
        map.end()
    }
}

/// Outcome of a filter materialization
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedSetResult {
    /// Name the new collection is addressable under
    pub collection_name: String,
    /// Number of member features
    pub matched_count: u64,
    /// Links to the new collection
    pub links: Vec<Link>,
}

/// Document kinds, one JSON schema each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    /// [`LandingPage`]
    Landing,
    /// [`ConformanceDeclaration`]
    Conformance,
    /// [`CollectionList`]
    Collections,
    /// [`CollectionSummary`]
    Collection,
    /// [`SingleFeatureResult`]
    Feature,
    /// [`FeatureCollectionResult`]
    FeatureCollection,
    /// [`MaterializedSetResult`]
    MaterializedSet,
}

impl DocumentKind {
    /// Every kind
    pub const ALL: [Self; 7] = [
        Self::Landing,
        Self::Conformance,
        Self::Collections,
        Self::Collection,
        Self::Feature,
        Self::FeatureCollection,
        Self::MaterializedSet,
    ];

    /// Stable label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Conformance => "conformance",
            Self::Collections => "collections",
            Self::Collection => "collection",
            Self::Feature => "feature",
            Self::FeatureCollection => "feature_collection",
            Self::MaterializedSet => "materialized_set",
        }
    }
}

/// A successful response body
#[derive(Debug, Clone)]
pub enum Document {
    /// `/`
    Landing(LandingPage),
    /// `/conformance`
    Conformance(ConformanceDeclaration),
    /// `/collections`
    Collections(CollectionList),
    /// `/collections/{name}`
    Collection(CollectionSummary),
    /// `/collections/{name}/items/{id}`
    Feature(Box<SingleFeatureResult>),
    /// `/collections/{name}/items`
    FeatureCollection(FeatureCollectionResult),
    /// `/filter`
    MaterializedSet(MaterializedSetResult),
}

impl Document {
    /// Kind of this document
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Landing(_) => DocumentKind::Landing,
            Self::Conformance(_) => DocumentKind::Conformance,
            Self::Collections(_) => DocumentKind::Collections,
            Self::Collection(_) => DocumentKind::Collection,
            Self::Feature(_) => DocumentKind::Feature,
            Self::FeatureCollection(_) => DocumentKind::FeatureCollection,
            Self::MaterializedSet(_) => DocumentKind::MaterializedSet,
        }
    }

    /// JSON form of this document
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Render` if serialization fails.
    pub fn to_json(&self) -> ServerResult<Value> {
        let value = match self {
            Self::Landing(doc) => serde_json::to_value(doc),
            Self::Conformance(doc) => serde_json::to_value(doc),
            Self::Collections(doc) => serde_json::to_value(doc),
            Self::Collection(doc) => serde_json::to_value(doc),
            Self::Feature(doc) => serde_json::to_value(doc),
            Self::FeatureCollection(doc) => serde_json::to_value(doc),
            Self::MaterializedSet(doc) => serde_json::to_value(doc),
        };
        value.map_err(|e| ServerError::Render {
            message: format!("{} document: {e}", self.kind().as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn link(rel: &str) -> Link {
        Link::new(format!("http://localhost/{rel}"), rel, "application/geo+json")
    }

    #[test]
    fn feature_collection_is_geojson() {
        let doc = Document::FeatureCollection(FeatureCollectionResult {
            features: vec![Feature::new("roads", 2).with_property("highway", "primary")],
            self_link: link("self"),
            prev_link: None,
            next_link: Some(link("next")),
            alternate: vec![],
            total_matched: 3,
            returned: 1,
        });
        let value = doc.to_json().unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["numberMatched"], 3);
        assert_eq!(value["numberReturned"], 1);
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["id"], 2);
        assert_eq!(value["features"][0]["properties"], json!({"highway": "primary"}));
        let rels: Vec<&str> = value["links"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["rel"].as_str().unwrap())
            .collect();
        assert_eq!(rels, vec!["self", "next"]);
    }

    #[test]
    fn single_feature_carries_links() {
        let doc = Document::Feature(Box::new(SingleFeatureResult {
            feature: Feature::new("roads", 1),
            self_link: link("self"),
            collection_link: link("collection"),
            alternate: vec![],
        }));
        let value = doc.to_json().unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"], Value::Null);
        assert_eq!(value["links"].as_array().unwrap().len(), 2);
        assert_eq!(doc.kind(), DocumentKind::Feature);
    }

    #[test]
    fn materialized_set_is_camel_case() {
        let value = Document::MaterializedSet(MaterializedSetResult {
            collection_name: "subset".into(),
            matched_count: 4,
            links: vec![],
        })
        .to_json()
        .unwrap();
        assert_eq!(value, json!({"collectionName": "subset", "matchedCount": 4, "links": []}));
    }

    #[test]
    fn conformance_lists_core() {
        let value = Document::Conformance(ConformanceDeclaration::default())
            .to_json()
            .unwrap();
        assert!(value["conformsTo"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c.as_str().is_some_and(|c| c.ends_with("/conf/core"))));
    }
}
