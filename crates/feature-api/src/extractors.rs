// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request extraction
//!
//! [`RequestContext`] captures what every endpoint needs from a request: the
//! method, the conditional-request header, the negotiated format and the base
//! URL for links. [`ItemsParams`] and [`FilterParams`] turn raw query pairs
//! into typed query inputs with descriptive 400s.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Method, header, request::Parts},
};
use feature_query::{PageWindow, PagingConfig, PropertyFilter};
use shared_types::{Extent, TimeFilter, feature::TIME_PROPERTY_KEYS, parse_time};

use crate::{
    error::{ServerError, ServerResult},
    negotiation::ContentFormat,
    state::ServerState,
};

/// Query parameters interpreted by the items endpoint itself
const ITEMS_RESERVED: [&str; 5] = ["f", "page", "limit", "bbox", "time"];

/// Query parameters interpreted by the filter endpoint itself
const FILTER_RESERVED: [&str; 3] = ["f", "extent", "name"];

/// Per-request inputs shared by every endpoint
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    if_none_match: Option<String>,
    format: Result<ContentFormat, String>,
    base_url: String,
    query: Vec<(String, String)>,
}

impl FromRequestParts<ServerState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let config = state.config();
        let query: Vec<(String, String)> = parts
            .uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let explicit = query.iter().find(|(k, _)| k == "f").map(|(_, v)| v.as_str());
        let format = ContentFormat::negotiate(explicit, &parts.headers, config.default_format)
            .map_err(|_| explicit.unwrap_or_default().to_string());

        let host = config
            .public_url
            .host_port
            .clone()
            .or_else(|| {
                parts
                    .headers
                    .get(header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| config.socket_addr().to_string());
        let base_url = format!(
            "{}://{}{}",
            config.public_url.scheme,
            host,
            config.public_url.base_path.trim_end_matches('/')
        );

        Ok(Self {
            method: parts.method.clone(),
            if_none_match: parts
                .headers
                .get(header::IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            format,
            base_url,
            query,
        })
    }
}

impl RequestContext {
    /// Build a context directly
    pub fn new(
        method: Method,
        format: ContentFormat,
        base_url: impl Into<String>,
        query: Vec<(String, String)>,
    ) -> Self {
        Self {
            method,
            if_none_match: None,
            format: Ok(format),
            base_url: base_url.into(),
            query,
        }
    }

    /// Whether the request is a `HEAD`
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Raw `If-None-Match` header
    pub fn if_none_match(&self) -> Option<&str> {
        self.if_none_match.as_deref()
    }

    /// Negotiated format
    ///
    /// # Errors
    ///
    /// Returns `ServerError::UnsupportedFormat` if `f` named an unknown format.
    pub fn format(&self) -> ServerResult<ContentFormat> {
        self.format
            .clone()
            .map_err(|format| ServerError::UnsupportedFormat { format })
    }

    /// Query pairs in request order
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Absolute URL of `path` with `pairs` as its query string
    pub fn href(&self, path: &str, pairs: &[(String, String)]) -> String {
        let mut href = format!("{}{}", self.base_url, path);
        if !pairs.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            href.push('?');
            href.push_str(&query);
        }
        href
    }
}

/// Percent-encode one path segment
pub fn path_segment(segment: &str) -> String {
    // byte_serialize writes spaces as '+' and escapes a literal '+'
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn single_values<'a>(
    pairs: &'a [(String, String)],
    reserved: &[&str],
) -> ServerResult<Vec<(&'a str, &'a str)>> {
    let mut seen: Vec<&str> = Vec::new();
    let mut out = Vec::new();
    for (key, value) in pairs {
        if reserved.contains(&key.as_str()) {
            if seen.contains(&key.as_str()) {
                return Err(ServerError::bad_request(format!(
                    "query parameter '{key}' must be given at most once"
                )));
            }
            seen.push(key);
            out.push((key.as_str(), value.as_str()));
        }
    }
    Ok(out)
}

fn parse_u64(key: &str, value: &str) -> ServerResult<u64> {
    value.trim().parse().map_err(|_| {
        ServerError::bad_request(format!("'{key}' must be a non-negative integer, got '{value}'"))
    })
}

/// Parse `minx,miny,maxx,maxy`
pub fn parse_bbox(value: &str) -> ServerResult<Extent> {
    let bounds: Vec<f64> = value
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ServerError::bad_request(format!("bbox '{value}' must be four numbers")))?;
    let [min_x, min_y, max_x, max_y] = bounds[..] else {
        return Err(ServerError::bad_request(format!(
            "bbox must have exactly 4 values, got {}",
            bounds.len()
        )));
    };
    Extent::new(min_x, min_y, max_x, max_y).map_err(ServerError::bad_request)
}

/// Parse an instant or a `start/stop` interval; `..` or an empty side is open
pub fn parse_time_param(value: &str) -> ServerResult<TimeFilter> {
    let bound = |side: &str| -> ServerResult<Option<_>> {
        let side = side.trim();
        if side.is_empty() || side == ".." {
            Ok(None)
        } else {
            parse_time(side).map(Some).map_err(ServerError::bad_request)
        }
    };

    let parts: Vec<&str> = value.split('/').collect();
    match parts[..] {
        [instant] => parse_time(instant)
            .map(TimeFilter::at)
            .map_err(ServerError::bad_request),
        [start, stop] => Ok(TimeFilter::between(bound(start)?, bound(stop)?)),
        _ => Err(ServerError::bad_request(format!(
            "time '{value}' must be an instant or a start/stop interval"
        ))),
    }
}

/// Parsed query of `/collections/{name}/items`
#[derive(Debug, Clone)]
pub struct ItemsParams {
    /// Page window
    pub window: PageWindow,
    /// Spatial constraint
    pub bbox: Option<Extent>,
    /// Property and time constraints
    pub filter: PropertyFilter,
    /// Parameters repeated verbatim in page links (filters, `bbox`, `time`)
    pub link_pairs: Vec<(String, String)>,
}

impl ItemsParams {
    /// Parse items query pairs
    ///
    /// # Errors
    ///
    /// Returns a 400-class error for repeated reserved parameters, malformed
    /// numbers, bounding boxes or times, and `limit=0`.
    pub fn parse(pairs: &[(String, String)], paging: &PagingConfig) -> ServerResult<Self> {
        let mut limit = None;
        let mut page = None;
        let mut bbox = None;
        let mut time = None;
        let mut link_pairs = Vec::new();
        for (key, value) in single_values(pairs, &ITEMS_RESERVED)? {
            match key {
                "limit" => limit = Some(parse_u64(key, value)?),
                "page" => page = Some(parse_u64(key, value)?),
                "bbox" => {
                    bbox = Some(parse_bbox(value)?);
                    link_pairs.push((key.to_string(), value.to_string()));
                }
                "time" => {
                    time = Some(parse_time_param(value)?);
                    link_pairs.push((key.to_string(), value.to_string()));
                }
                _ => {}
            }
        }

        let properties: Vec<(String, String)> = pairs
            .iter()
            .filter(|(k, _)| !ITEMS_RESERVED.contains(&k.as_str()))
            .cloned()
            .collect();
        let mut filter = PropertyFilter::from_pairs(properties.iter().cloned())?;
        if let Some(time) = time {
            if !filter.time().is_empty() {
                return Err(ServerError::bad_request(format!(
                    "'time' cannot be combined with {}",
                    TIME_PROPERTY_KEYS.join(", ")
                )));
            }
            filter = filter.with_time(time);
        }
        link_pairs.extend(properties);

        Ok(Self {
            window: paging.window(limit, page)?,
            bbox,
            filter,
            link_pairs,
        })
    }
}

/// Parsed query of `/filter`
#[derive(Debug, Clone)]
pub struct FilterParams {
    /// Collections to filter; every source collection when empty
    pub collections: Vec<String>,
    /// Spatial constraint
    pub extent: Option<Extent>,
    /// Requested name of the new collection
    pub name: Option<String>,
    /// Property and time constraints
    pub filter: PropertyFilter,
}

impl FilterParams {
    /// Parse filter query pairs
    ///
    /// # Errors
    ///
    /// Returns a 400-class error for a malformed `extent`, repeated `name` or
    /// `extent`, or malformed time filters.
    pub fn parse(pairs: &[(String, String)]) -> ServerResult<Self> {
        let mut extent = None;
        let mut name = None;
        for (key, value) in single_values(pairs, &FILTER_RESERVED)? {
            match key {
                "extent" => {
                    let [min_x, min_y, max_x, max_y] = serde_json::from_str::<[f64; 4]>(value)
                        .map_err(|e| {
                            ServerError::bad_request(format!(
                                "extent must be a JSON array of four numbers: {e}"
                            ))
                        })?;
                    extent = Some(
                        Extent::new(min_x, min_y, max_x, max_y).map_err(ServerError::bad_request)?,
                    );
                }
                "name" => name = Some(value.to_string()),
                _ => {}
            }
        }

        let collections = pairs
            .iter()
            .filter(|(k, _)| k == "collection")
            .map(|(_, v)| v.clone())
            .collect();
        let filter = PropertyFilter::from_pairs(
            pairs
                .iter()
                .filter(|(k, _)| k != "collection" && !FILTER_RESERVED.contains(&k.as_str()))
                .cloned(),
        )?;

        Ok(Self {
            collections,
            extent,
            name,
            filter,
        })
    }
}
