// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Feature query core
//!
//! Turns a parsed feature request into a filtered, stably ordered and paged
//! result, and keeps ad-hoc filter results around as ephemeral collections.
//!
//! # Components
//!
//! - [`temporal`]: does a feature's time metadata intersect a [`TimeFilter`]
//! - [`filter`]: exact-match property constraints plus time constraints
//! - [`adapter`]: the query-side view of a [`FeatureSource`]
//! - [`ephemeral`]: shared store of materialized filter results and its idle reaper
//! - [`orchestrator`]: single features, feature pages and filter materialization
//! - [`fingerprint`]: content fingerprints computed from a request's logical identity
//!
//! [`TimeFilter`]: shared_types::TimeFilter
//! [`FeatureSource`]: feature_source::FeatureSource

pub mod adapter;
pub mod ephemeral;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod orchestrator;
pub mod temporal;

pub use adapter::CollectionSource;
pub use ephemeral::{EphemeralStore, spawn_idle_reaper};
pub use error::QueryError;
pub use filter::PropertyFilter;
pub use fingerprint::ContentFingerprint;
pub use orchestrator::{
    CollectionInfo, CollectionKind, FeaturePage, MaterializedSet, PageWindow, PagingConfig,
    QueryOrchestrator,
};
