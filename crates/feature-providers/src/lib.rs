// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Feature source implementations
//!
//! This crate provides implementations of the `FeatureSource` trait and the
//! backend selection the server holds.
//!
//! # Architecture
//!
//! - **Source Implementations**: [`memory`], [`directory`] - concrete providers
//! - **Backend Selection**: [`backend::SourceBackend`] - one enum the server is
//!   built around, dispatching to the configured provider

pub mod backend;
pub mod directory;
pub mod memory;

pub use backend::SourceBackend;
pub use directory::{GeoJsonDirectorySource, default_data_dir};
pub use memory::MemorySource;
