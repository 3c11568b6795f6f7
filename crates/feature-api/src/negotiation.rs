// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Representation negotiation
//!
//! Resolution order: the `f` query parameter, then the `Content-Type` header,
//! then `Accept`, then the configured default. Only an explicit `f` can fail;
//! headers naming something unknown are ignored.

use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ServerError;

/// Representations the service can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    /// Structured data (`application/json`, GeoJSON for features)
    Json,
    /// Human-readable page
    Html,
}

impl ContentFormat {
    /// Every supported format
    pub const ALL: [Self; 2] = [Self::Json, Self::Html];

    /// `Content-Type` of a response in this format
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html; charset=utf-8",
        }
    }

    /// Value of the `f` parameter selecting this format
    pub fn query_value(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
        }
    }

    /// Parse an explicit `f` value
    ///
    /// # Errors
    ///
    /// Returns `ServerError::UnsupportedFormat` for anything not offered.
    pub fn from_query(value: &str) -> Result<Self, ServerError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" | "geojson" | "application/json" | "application/geo+json" => Ok(Self::Json),
            "html" | "text/html" => Ok(Self::Html),
            _ => Err(ServerError::UnsupportedFormat {
                format: value.to_string(),
            }),
        }
    }

    fn from_media_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/json" | "application/geo+json" => Some(Self::Json),
            "text/html" => Some(Self::Html),
            _ => None,
        }
    }

    /// First recognised media type of an `Accept` header, in listed order
    fn from_accept(value: &str) -> Option<Self> {
        value.split(',').find_map(Self::from_media_type)
    }

    /// Resolve the response format for a request
    ///
    /// # Errors
    ///
    /// Returns `ServerError::UnsupportedFormat` when `f` names an unknown format.
    pub fn negotiate(
        explicit: Option<&str>,
        headers: &HeaderMap,
        default: Self,
    ) -> Result<Self, ServerError> {
        if let Some(value) = explicit {
            return Self::from_query(value);
        }
        let header_value = |name| headers.get(name).and_then(|v| v.to_str().ok());
        Ok(header_value(header::CONTENT_TYPE)
            .and_then(Self::from_media_type)
            .or_else(|| header_value(header::ACCEPT).and_then(Self::from_accept))
            .unwrap_or(default))
    }
}
