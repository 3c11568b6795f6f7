// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct and implementation for the feature
//! API server, including server lifecycle management, router configuration, the
//! ephemeral collection reaper and coordinated graceful shutdown using
//! `CancellationToken`.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, http::HeaderName};
use feature_providers::{GeoJsonDirectorySource, SourceBackend, default_data_dir};
use feature_query::{EphemeralStore, QueryOrchestrator, spawn_idle_reaper};
use hyper::Request;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn};

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    routes::create_routes,
    schema::SchemaRegistry,
    state::ServerState,
};

// Server constants
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS: u64 = 5;

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for graceful shutdown before forcing termination
    pub graceful_timeout: Duration,
    /// Maximum time to wait for all tasks to complete after graceful shutdown
    pub force_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
            force_timeout: Duration::from_secs(DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Application router
    router: Router,
    /// Server state
    state: ServerState,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    graceful_shutdown_config: ShutdownConfig,
}

impl Server {
    /// Create new server instance over the configured GeoJSON directory
    ///
    /// Without `source.data_dir`, the first of `.`, `data` and `test_data`
    /// holding a `*.geojson` file is used.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> ServerResult<Self> {
        let data_dir = Self::resolve_data_dir(&config);
        info!(data_dir = %data_dir.display(), "serving GeoJSON collections");
        let source = SourceBackend::from(GeoJsonDirectorySource::new(data_dir));
        Self::with_source(config, shutdown_config, source)
    }

    fn resolve_data_dir(config: &ServerConfig) -> PathBuf {
        config
            .source
            .data_dir
            .clone()
            .or_else(default_data_dir)
            .unwrap_or_else(|| {
                warn!("no directory with GeoJSON collections found, using the working directory");
                PathBuf::from(".")
            })
    }

    /// Create server over an explicit feature source for dependency injection
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid or a
    /// response schema does not compile.
    pub fn with_source(
        config: ServerConfig,
        graceful_shutdown_config: ShutdownConfig,
        source: impl Into<SourceBackend>,
    ) -> ServerResult<Self> {
        config.paging.validate().map_err(|e| ServerError::Config {
            message: format!("invalid paging configuration: {e}"),
        })?;

        let orchestrator = QueryOrchestrator::new(
            Arc::new(source.into()),
            Arc::new(EphemeralStore::new()),
            config.paging.into(),
        );
        let cancellation_token = CancellationToken::new();
        let state = ServerState::new(
            config.clone(),
            Arc::new(orchestrator),
            Arc::new(SchemaRegistry::new()?),
            cancellation_token.child_token(),
        );
        let router = Self::create_router(state.clone());

        Ok(Self {
            config,
            router,
            state,
            cancellation_token,
            graceful_shutdown_config,
        })
    }

    /// Create application router with middleware
    fn create_router(state: ServerState) -> Router {
        let timeout_duration = state.config().timeout_seconds.value();

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    if let Some(request_id) = req.headers().get(REQUEST_ID_HEADER) {
                        info_span!("http_request", ?request_id, method = %req.method(), uri = %req.uri())
                    } else {
                        tracing::error!("failed to extract id from request");
                        info_span!("http_request", request_id = "unknown")
                    }
                }),
            )
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(timeout_duration));

        create_routes().layer(middleware).with_state(state)
    }

    /// Start the idle reaper when an ephemeral TTL is configured
    fn spawn_reaper(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let (idle, interval) = self.config.ephemeral.reaper_settings()?;
        info!(
            idle_secs = idle.as_secs(),
            interval_secs = interval.as_secs(),
            "starting ephemeral collection reaper"
        );
        let store = Arc::clone(self.state.orchestrator().collections().store());
        Some(spawn_idle_reaper(store, idle, interval, shutdown))
    }

    /// Run the server with coordinated graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address,
    /// or `ServerError::Startup` if the server fails to start.
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        info!(
            address = %actual_addr,
            environment = %self.config.environment,
            "feature API server starting",
        );

        let cancellation_token = self.cancellation_token.clone();
        let shutdown_token = cancellation_token.clone();
        tokio::spawn(async move {
            info!("spawning the graceful shutdown task");
            Self::shutdown_signal_handler(shutdown_token).await;
        });

        let reaper = self.spawn_reaper(cancellation_token.child_token());
        let force_timeout = self.graceful_shutdown_config.force_timeout;
        let graceful_timeout = self.graceful_shutdown_config.graceful_timeout;

        let serve_token = cancellation_token.clone();
        let serve = axum::serve(listener, self.router).with_graceful_shutdown(async move {
            serve_token.cancelled().await;
            info!("feature API server draining connections");
        })
        .into_future();
        let server_result = tokio::select! {
            result = serve => result,
            () = async {
                cancellation_token.cancelled().await;
                tokio::time::sleep(graceful_timeout).await;
            } => {
                warn!(timeout_secs = graceful_timeout.as_secs(), "graceful shutdown timed out, forcing termination");
                Ok(())
            }
        };

        if let Some(reaper) = reaper {
            match tokio::time::timeout(force_timeout, reaper).await {
                Ok(joined) => joined?,
                Err(_) => warn!("ephemeral collection reaper did not stop in time"),
            }
        }

        if let Err(e) = server_result {
            error!(error = ?e, "Server error during shutdown");
            Err(ServerError::Shutdown { source: e })
        } else {
            info!("feature API server shut down gracefully");
            Ok(())
        }
    }

    /// Handle shutdown signals and trigger coordinated cancellation
    ///
    /// This function listens for SIGINT (Ctrl+C) and SIGTERM signals,
    /// and cancels the provided cancellation token when received.
    async fn shutdown_signal_handler(cancellation_token: CancellationToken) {
        let signal_received = async {
            #[cfg(unix)]
            #[allow(clippy::expect_used)]
            {
                use tokio::signal::unix::{SignalKind, signal};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
                let mut sigint =
                    signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => {
                        warn!("Received SIGTERM signal, initiating coordinated shutdown");
                        "SIGTERM"
                    },
                    _ = sigint.recv() => {
                        warn!("Received SIGINT signal, initiating coordinated shutdown");
                        "SIGINT"
                    },
                }
            }

            #[cfg(not(unix))]
            #[allow(clippy::expect_used)]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install CTRL+C signal handler");
                warn!("Received CTRL+C signal, initiating coordinated shutdown");
                "CTRL+C"
            }
        };

        tokio::select! {
            signal_name = signal_received => {
                warn!("Shutdown signal {} received, cancelling all operations...", signal_name);
                cancellation_token.cancel();
            },
            () = cancellation_token.cancelled() => {
                warn!("Cancellation token already cancelled, shutdown signal handler exiting");
            }
        }
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.cancellation_token.cancel();
    }

    /// Run server for testing, returns the bound address
    ///
    /// Cancelling the returned token stops the server and the reaper.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn run_for_testing(self) -> ServerResult<(SocketAddr, CancellationToken)> {
        let addr = self.config.socket_addr();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        let token = self.cancellation_token.child_token();
        let _reaper = self.spawn_reaper(token.child_token());
        let task = token.child_token();
        tokio::spawn(async move {
            let _ = axum::serve(listener, self.router)
                .with_graceful_shutdown(async move { task.cancelled().await })
                .await;
        });

        Ok((actual_addr, token))
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use feature_providers::MemorySource;

    use super::*;
    use crate::config::{EphemeralConfig, Environment, PagingSettings};

    fn server(config: ServerConfig) -> ServerResult<Server> {
        Server::with_source(config, ShutdownConfig::default(), MemorySource::new())
    }

    #[tokio::test]
    async fn server_creation() -> ServerResult<()> {
        let server = server(ServerConfig::for_testing())?;
        assert_eq!(server.config().environment, Environment::Testing);
        assert!(!server.cancellation_token().is_cancelled());
        Ok(())
    }

    #[tokio::test]
    async fn programmatic_shutdown() -> ServerResult<()> {
        let server = server(ServerConfig::for_testing())?;

        assert!(!server.cancellation_token().is_cancelled());
        server.shutdown();
        assert!(server.cancellation_token().is_cancelled());
        assert!(server.state().cancellation_token.is_cancelled());
        Ok(())
    }

    #[test]
    fn invalid_paging_is_rejected() {
        let config = ServerConfig {
            paging: PagingSettings {
                default_limit: 100,
                max_limit: 10,
            },
            ..ServerConfig::for_testing()
        };
        assert!(matches!(server(config), Err(ServerError::Config { .. })));
    }

    #[tokio::test]
    async fn reaper_only_with_ttl() -> ServerResult<()> {
        let token = CancellationToken::new();
        assert!(server(ServerConfig::for_testing())?.spawn_reaper(token.clone()).is_none());

        let config = ServerConfig {
            ephemeral: EphemeralConfig {
                idle_ttl_seconds: Some(60),
                sweep_interval_seconds: 1,
            },
            ..ServerConfig::for_testing()
        };
        let reaper = server(config)?.spawn_reaper(token.clone());
        assert!(reaper.is_some());
        token.cancel();
        if let Some(reaper) = reaper {
            reaper.await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_config_default() {
        let config = ShutdownConfig::default();
        assert_eq!(
            config.graceful_timeout,
            Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS)
        );
        assert_eq!(
            config.force_timeout,
            Duration::from_secs(DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS)
        );
    }
}
