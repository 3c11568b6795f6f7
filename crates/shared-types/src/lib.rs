// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the feature API service
//!
//! This crate provides the feature data model shared by the feature source,
//! the query core and the HTTP service, avoiding circular dependencies.

pub mod extent;
pub mod feature;
pub mod time;

pub use extent::Extent;
pub use feature::{Feature, FeatureId, PropertyValue};
pub use time::{MalformedTimeValue, TimeFilter, parse_time};
