// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the feature API server:
//! configuration, the query orchestrator over the configured feature source,
//! compiled response schemas and coordinated cancellation.

use std::sync::Arc;

use feature_providers::SourceBackend;
use feature_query::QueryOrchestrator;
use feature_source::{FeatureSource, HealthStatus};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::{
    config::{Environment, ServerConfig},
    schema::SchemaRegistry,
};

/// Orchestrator type held by the server
pub type Orchestrator = QueryOrchestrator<SourceBackend>;

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: ServerConfig,
    /// Query entry point
    orchestrator: Arc<Orchestrator>,
    /// Compiled response schemas
    schemas: Arc<SchemaRegistry>,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `orchestrator` - Query orchestrator over the feature source
    /// * `schemas` - Compiled response schemas
    /// * `cancellation_token` - Token for coordinated cancellation
    pub fn new(
        config: ServerConfig,
        orchestrator: Arc<Orchestrator>,
        schemas: Arc<SchemaRegistry>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            orchestrator,
            schemas,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Query orchestrator
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Response schemas
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Number of ephemeral collections currently held
    pub fn ephemeral_count(&self) -> usize {
        self.orchestrator.collections().store().len()
    }

    /// Check the feature source
    pub async fn health_check(&self) -> HealthCheck {
        let source = self.orchestrator.collections().source();
        HealthCheck {
            status: source.health_check().await,
            version: Box::from(env!("CARGO_PKG_VERSION")),
            environment: self.config.environment,
            timestamp: chrono::Utc::now().to_rfc3339(),
            source: source.name(),
            ephemeral_collections: self.ephemeral_count(),
        }
    }
}

/// Health check status
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheck {
    /// Feature source status
    #[schema(value_type = Object)]
    pub status: HealthStatus,
    /// Service version
    pub version: Box<str>,
    /// Environment
    pub environment: Environment,
    /// Timestamp
    pub timestamp: String,
    /// Feature source in use
    pub source: &'static str,
    /// Ephemeral collections currently held
    pub ephemeral_collections: usize,
}
