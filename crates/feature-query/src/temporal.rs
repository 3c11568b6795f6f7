// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Temporal intersection between features and time filters
//!
//! A feature may carry `start_time`, `stop_time` and `timestamp` properties.
//! Features carrying none of them are never excluded by time.

use chrono::{DateTime, Utc};
use shared_types::{Feature, MalformedTimeValue, PropertyValue, TimeFilter, parse_time};

/// Parsed time metadata of one feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FeatureTimes {
    start: Option<DateTime<Utc>>,
    stop: Option<DateTime<Utc>>,
    timestamp: Option<DateTime<Utc>>,
}

impl FeatureTimes {
    fn read(feature: &Feature) -> Result<Self, MalformedTimeValue> {
        Ok(Self {
            start: read_time(feature, "start_time")?,
            stop: read_time(feature, "stop_time")?,
            timestamp: read_time(feature, "timestamp")?,
        })
    }

    fn is_empty(&self) -> bool {
        self.start.is_none() && self.stop.is_none() && self.timestamp.is_none()
    }

    /// Any of the feature's instants satisfying `accept`
    fn any(&self, accept: impl Fn(DateTime<Utc>) -> bool) -> bool {
        [self.timestamp, self.start, self.stop]
            .into_iter()
            .flatten()
            .any(accept)
    }
}

fn read_time(feature: &Feature, key: &str) -> Result<Option<DateTime<Utc>>, MalformedTimeValue> {
    match feature.property(key) {
        None => Ok(None),
        Some(PropertyValue::String(s)) if s.is_empty() => Ok(None),
        Some(PropertyValue::String(s)) => parse_time(s).map(Some),
        Some(other) => Err(MalformedTimeValue {
            value: match other {
                PropertyValue::Json(v) => v.to_string(),
                PropertyValue::Boolean(b) => b.to_string(),
                PropertyValue::Integer(i) => i.to_string(),
                PropertyValue::Float(x) => x.to_string(),
                PropertyValue::String(s) => s.clone(),
            },
        }),
    }
}

/// Whether `feature` intersects `filter`
///
/// Interval requests match when the feature's timestamp, start or stop falls
/// within the (possibly half-open) request interval. A point request matches
/// an equal feature timestamp, or an instant inside the feature's interval
/// where a missing feature bound is open.
///
/// # Errors
///
/// Returns [`MalformedTimeValue`] when a time property of the feature is not
/// a string in one of the accepted formats. Features are only parsed when the
/// filter constrains anything.
pub fn intersects(feature: &Feature, filter: &TimeFilter) -> Result<bool, MalformedTimeValue> {
    if filter.is_empty() {
        return Ok(true);
    }
    let times = FeatureTimes::read(feature)?;
    if times.is_empty() {
        return Ok(true);
    }

    let interval_match = match (filter.start, filter.stop) {
        (None, None) => false,
        (None, Some(stop)) => times.any(|t| t <= stop),
        (Some(start), None) => times.any(|t| t >= start),
        (Some(start), Some(stop)) => times.any(|t| start <= t && t <= stop),
    };
    if interval_match {
        return Ok(true);
    }

    Ok(filter
        .timestamp
        .is_some_and(|point| point_intersects(&times, point)))
}

fn point_intersects(times: &FeatureTimes, point: DateTime<Utc>) -> bool {
    if times.timestamp == Some(point) {
        return true;
    }
    if times.start.is_none() && times.stop.is_none() {
        return false;
    }
    times.start.is_none_or(|start| start <= point) && times.stop.is_none_or(|stop| point <= stop)
}
