// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Property filters
//!
//! Non-reserved keys require an exactly equal property value. The reserved
//! keys `start_time`, `stop_time` and `timestamp` are folded into a
//! [`TimeFilter`] and evaluated by [`crate::temporal::intersects`].

use std::{collections::BTreeMap, fmt::Write as _};

use shared_types::{Feature, TimeFilter, feature::TIME_PROPERTY_KEYS, parse_time};
use tracing::warn;

use crate::{QueryError, temporal};

/// Exact-match and temporal constraints on features
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    exact: BTreeMap<String, String>,
    time: TimeFilter,
}

impl PropertyFilter {
    /// A filter accepting every feature
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from request key/value pairs
    ///
    /// The first value of a repeated key wins. Reserved time keys must hold a
    /// parseable, non-empty instant.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut filter = Self::new();
        let mut seen_time_keys: Vec<String> = Vec::new();
        for (key, value) in pairs {
            let (key, value) = (key.into(), value.into());
            if TIME_PROPERTY_KEYS.contains(&key.as_str()) {
                if seen_time_keys.contains(&key) {
                    warn!(key = %key, ignored = %value, "repeated time filter, keeping first value");
                    continue;
                }
                filter.set_time_key(&key, &value)?;
                seen_time_keys.push(key);
            } else if filter.exact.contains_key(&key) {
                warn!(key = %key, ignored = %value, "repeated property filter, keeping first value");
            } else {
                filter.exact.insert(key, value);
            }
        }
        Ok(filter)
    }

    fn set_time_key(&mut self, key: &str, value: &str) -> Result<(), QueryError> {
        if value.trim().is_empty() {
            return Err(QueryError::invalid_request(format!(
                "time filter '{key}' must not be empty"
            )));
        }
        let instant = parse_time(value).map_err(QueryError::invalid_request)?;
        match key {
            "start_time" => self.time.start = Some(instant),
            "stop_time" => self.time.stop = Some(instant),
            _ => self.time.timestamp = Some(instant),
        }
        Ok(())
    }

    /// Add an exact-match constraint
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.exact.insert(key.into(), value.into());
        self
    }

    /// Replace the time constraint
    #[must_use]
    pub fn with_time(mut self, time: TimeFilter) -> Self {
        self.time = time;
        self
    }

    /// Exact-match constraints, sorted by key
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.exact.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The time constraint
    pub fn time(&self) -> &TimeFilter {
        &self.time
    }

    /// Whether the filter accepts every feature
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.time.is_empty()
    }

    /// Whether `feature` satisfies every constraint
    ///
    /// A feature whose stored time metadata cannot be parsed is excluded from
    /// time-filtered queries and logged; it never fails the whole query.
    pub fn matches(&self, feature: &Feature) -> bool {
        let exact = self.exact.iter().all(|(key, expected)| {
            feature
                .property(key)
                .is_some_and(|value| value.matches_text(expected))
        });
        if !exact {
            return false;
        }
        match temporal::intersects(feature, &self.time) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(
                    collection = %feature.collection,
                    id = feature.id,
                    error = %e,
                    "excluding feature with malformed time metadata"
                );
                false
            }
        }
    }

    /// Stable textual form, independent of insertion order and time offsets
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.exact {
            let _ = write!(out, "{}:{key}={}:{value};", key.len(), value.len());
        }
        out.push_str(&self.time.canonical());
        out
    }
}
