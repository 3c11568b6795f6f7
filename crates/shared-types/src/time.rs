// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Time values used by temporal filtering

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A time string that matched none of the accepted formats
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to parse time string: '{value}'")]
pub struct MalformedTimeValue {
    /// The offending input
    pub value: String,
}

/// Parse an instant from one of the accepted formats.
///
/// Accepted, in order: RFC 3339 with offset (`2018-04-01T12:00:00+02:00`),
/// RFC 3339 without offset (`2018-04-01T12:00:00`, read as UTC) and a bare
/// date (`2018-04-01`, midnight UTC).
pub fn parse_time(value: &str) -> Result<DateTime<Utc>, MalformedTimeValue> {
    let trimmed = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(t.and_utc());
    }
    if let Some(t) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(t.and_utc());
    }
    Err(MalformedTimeValue {
        value: value.to_string(),
    })
}

/// Requested time constraint
///
/// Every bound is optional. An empty filter places no temporal constraint on
/// features at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFilter {
    /// Inclusive interval start
    pub start: Option<DateTime<Utc>>,
    /// Inclusive interval stop
    pub stop: Option<DateTime<Utc>>,
    /// Point-in-time query
    pub timestamp: Option<DateTime<Utc>>,
}

impl TimeFilter {
    /// A filter constraining nothing
    pub const fn none() -> Self {
        Self {
            start: None,
            stop: None,
            timestamp: None,
        }
    }

    /// Interval filter, either side optional
    pub const fn between(start: Option<DateTime<Utc>>, stop: Option<DateTime<Utc>>) -> Self {
        Self {
            start,
            stop,
            timestamp: None,
        }
    }

    /// Point-in-time filter
    pub const fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            start: None,
            stop: None,
            timestamp: Some(timestamp),
        }
    }

    /// Whether no bound at all is set
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.stop.is_none() && self.timestamp.is_none()
    }

    /// Stable textual form used for fingerprints and links
    pub fn canonical(&self) -> String {
        let fmt = |t: Option<DateTime<Utc>>| {
            t.map_or_else(String::new, |t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        };
        format!(
            "start={};stop={};timestamp={}",
            fmt(self.start),
            fmt(self.stop),
            fmt(self.timestamp)
        )
    }
}
