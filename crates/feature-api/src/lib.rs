// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Feature API Server Implementation
//!
//! This crate provides the HTTP server for the feature API service, built with
//! Axum: OGC API Features style access to source collections and to ephemeral
//! collections materialized from filter requests.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration and environment management with hierarchical loading
//! - [`error`]: Error types and HTTP response handling with proper status codes
//! - [`state`]: Shared application state management with cancellation token support
//! - [`server`]: Main server implementation, lifecycle, and coordinated shutdown
//! - [`routes`]: Route configuration and HTTP request handlers
//! - [`extractors`]: Request context and query parameter parsing
//! - [`negotiation`]: Response format selection
//! - [`delivery`]: Fingerprint, conditional short circuit, render and validate pipeline
//! - [`document`]: Response document types
//! - [`schema`]: JSON schemas of structured responses
//! - [`html`]: HTML rendering
//! - [`metrics`]: Prometheus metrics
//! - [`openapi`]: `OpenAPI` specification served at `/api`
//!
//! # Key Features
//!
//! - **Conditional Requests**: `ETag`s computed from the request alone; `HEAD` and
//!   matching `If-None-Match` requests never run a query
//! - **Self-checking Responses**: every JSON body is validated against its schema
//! - **Ephemeral Collections**: filter results addressable as collections, with
//!   an optional idle reaper
//! - **Graceful Shutdown**: Coordinated termination using `CancellationToken` with timeouts

pub mod config;
pub mod delivery;
pub mod document;
pub mod error;
pub mod extractors;
pub mod html;
pub mod metrics;
pub mod negotiation;
pub mod openapi;
pub mod routes;
pub mod schema;
pub mod server;
pub mod state;

pub use config::{Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use negotiation::ContentFormat;
pub use server::{Server, ShutdownConfig};
pub use state::{HealthCheck, ServerState};
