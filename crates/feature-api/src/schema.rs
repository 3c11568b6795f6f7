// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Response schemas
//!
//! Each [`DocumentKind`] declares a JSON schema. Structured responses are
//! checked against it before they leave the process; a mismatch is a server
//! defect, never passed through.

use std::collections::BTreeMap;

use jsonschema::Validator;
use serde_json::{Value, json};

use crate::{
    document::DocumentKind,
    error::{ServerError, ServerResult},
};

fn link_schema() -> Value {
    json!({
        "type": "object",
        "required": ["href", "rel", "type"],
        "properties": {
            "href": {"type": "string", "minLength": 1},
            "rel": {"type": "string", "minLength": 1},
            "type": {"type": "string"},
            "title": {"type": "string"}
        }
    })
}

fn links_schema() -> Value {
    json!({"type": "array", "items": link_schema()})
}

fn feature_schema() -> Value {
    json!({
        "type": "object",
        "required": ["type", "id", "geometry", "properties"],
        "properties": {
            "type": {"const": "Feature"},
            "id": {"type": "integer", "minimum": 0},
            "collection": {"type": "string"},
            "geometry": {
                "oneOf": [
                    {"type": "null"},
                    {"type": "object", "required": ["type"]}
                ]
            },
            "properties": {"type": "object"},
            "links": links_schema()
        }
    })
}

fn collection_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name", "kind", "links"],
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "title": {"type": "string"},
            "kind": {"enum": ["source", "ephemeral"]},
            "links": links_schema()
        }
    })
}

/// Declared schema of a document kind
pub fn schema_for(kind: DocumentKind) -> Value {
    match kind {
        DocumentKind::Landing => json!({
            "type": "object",
            "required": ["title", "links"],
            "properties": {
                "title": {"type": "string"},
                "description": {"type": "string"},
                "links": links_schema()
            }
        }),
        DocumentKind::Conformance => json!({
            "type": "object",
            "required": ["conformsTo"],
            "properties": {
                "conformsTo": {"type": "array", "items": {"type": "string"}, "minItems": 1}
            }
        }),
        DocumentKind::Collections => json!({
            "type": "object",
            "required": ["collections", "links"],
            "properties": {
                "collections": {"type": "array", "items": collection_schema()},
                "links": links_schema()
            }
        }),
        DocumentKind::Collection => collection_schema(),
        DocumentKind::Feature => feature_schema(),
        DocumentKind::FeatureCollection => json!({
            "type": "object",
            "required": ["type", "features", "links", "numberMatched", "numberReturned"],
            "properties": {
                "type": {"const": "FeatureCollection"},
                "features": {"type": "array", "items": feature_schema()},
                "links": links_schema(),
                "numberMatched": {"type": "integer", "minimum": 0},
                "numberReturned": {"type": "integer", "minimum": 0}
            }
        }),
        DocumentKind::MaterializedSet => json!({
            "type": "object",
            "required": ["collectionName", "matchedCount"],
            "properties": {
                "collectionName": {"type": "string", "minLength": 1},
                "matchedCount": {"type": "integer", "minimum": 0},
                "links": links_schema()
            }
        }),
    }
}

/// Compiled validators for every document kind
#[derive(Debug)]
pub struct SchemaRegistry {
    validators: BTreeMap<DocumentKind, Validator>,
}

impl SchemaRegistry {
    /// Compile every declared schema
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if a schema does not compile.
    pub fn new() -> ServerResult<Self> {
        let mut validators = BTreeMap::new();
        for kind in DocumentKind::ALL {
            let validator =
                jsonschema::validator_for(&schema_for(kind)).map_err(|e| ServerError::Config {
                    message: format!("invalid {} schema: {e}", kind.as_str()),
                })?;
            validators.insert(kind, validator);
        }
        Ok(Self { validators })
    }

    /// Check a document against its declared schema
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SchemaValidation` with every validator message.
    pub fn validate(&self, kind: DocumentKind, document: &Value) -> ServerResult<()> {
        let Some(validator) = self.validators.get(&kind) else {
            return Err(ServerError::SchemaValidation {
                document: kind.as_str(),
                errors: vec!["no schema registered".to_string()],
            });
        };
        let errors: Vec<String> = validator
            .iter_errors(document)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServerError::SchemaValidation {
                document: kind.as_str(),
                errors,
            })
        }
    }
}
