// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! This module provides configuration structures and logic for the feature API
//! server, supporting different environments and validation of configuration
//! parameters.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use feature_query::{PagingConfig, orchestrator};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    error::{ServerError, ServerResult},
    negotiation::ContentFormat,
};

const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Default development port, matching the classic WFS3 demo servers
    pub const fn default_development() -> Self {
        Self {
            port: 9000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // re-validated in `ServerConfig::load` once the environment is known
        Ok(Self {
            port,
            environment: Environment::Development,
        })
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Create a safe default timeout (30 seconds)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(30))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

/// How the service addresses itself in links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUrlConfig {
    /// `http` or `https`
    pub scheme: String,
    /// `host[:port]` used in links; the request `Host` header when absent
    pub host_port: Option<String>,
    /// Path prefix the service is mounted under, without trailing slash
    pub base_path: String,
}

impl Default for PublicUrlConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host_port: None,
            base_path: String::new(),
        }
    }
}

/// Page size settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingSettings {
    /// Page size when a request names none
    pub default_limit: u64,
    /// Largest page size served
    pub max_limit: u64,
}

impl PagingSettings {
    /// Check `1 <= default_limit <= max_limit`
    ///
    /// # Errors
    ///
    /// Returns an error describing the violated bound
    pub fn validate(&self) -> Result<()> {
        ensure!(self.default_limit >= 1, "default_limit must be at least 1");
        ensure!(
            self.default_limit <= self.max_limit,
            "default_limit ({}) cannot exceed max_limit ({})",
            self.default_limit,
            self.max_limit
        );
        Ok(())
    }
}

impl Default for PagingSettings {
    fn default() -> Self {
        Self {
            default_limit: orchestrator::DEFAULT_LIMIT,
            max_limit: orchestrator::MAX_LIMIT,
        }
    }
}

impl From<PagingSettings> for PagingConfig {
    fn from(settings: PagingSettings) -> Self {
        Self {
            default_limit: settings.default_limit,
            max_limit: settings.max_limit,
        }
    }
}

/// Ephemeral collection retention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralConfig {
    /// Idle time after which an ephemeral collection is dropped; kept forever when unset
    pub idle_ttl_seconds: Option<u64>,
    /// How often idle collections are swept
    pub sweep_interval_seconds: u64,
}

impl EphemeralConfig {
    /// Idle TTL and sweep interval, when reaping is enabled
    pub fn reaper_settings(&self) -> Option<(Duration, Duration)> {
        let ttl = self.idle_ttl_seconds?;
        Some((
            Duration::from_secs(ttl),
            Duration::from_secs(self.sweep_interval_seconds.max(1)),
        ))
    }
}

impl Default for EphemeralConfig {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: None,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

/// Feature source settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory of `*.geojson` collections; discovered when unset
    pub data_dir: Option<PathBuf>,
}

/// Service description shown on the landing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Service title
    pub title: String,
    /// Service description
    pub description: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            title: "Feature API".to_string(),
            description: "OGC API Features access to geospatial collections".to_string(),
        }
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
    /// Public addressing used in links
    #[serde(default)]
    pub public_url: PublicUrlConfig,
    /// Page sizes
    #[serde(default)]
    pub paging: PagingSettings,
    /// Representation used when a request does not ask for one
    pub default_format: ContentFormat,
    /// Ephemeral collection retention
    #[serde(default)]
    pub ephemeral: EphemeralConfig,
    /// Feature source
    #[serde(default)]
    pub source: SourceConfig,
    /// Landing page metadata
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::default_development(),
            timeout_seconds: TimeoutSeconds::default(),
            environment: Environment::Development,
            public_url: PublicUrlConfig::default(),
            paging: PagingSettings::default(),
            default_format: ContentFormat::Json,
            ephemeral: EphemeralConfig::default(),
            source: SourceConfig::default(),
            metadata: MetadataConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (`config.toml`, `config.json`, ...)
    /// 3. Environment-specific files (`config.{env}.*`)
    /// 4. Environment variables with `SERVER_` prefix; nested keys use `__`
    ///    (`SERVER_PAGING__MAX_LIMIT=500`)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let defaults = Self::default();

        let mut config_builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", i64::from(defaults.port.value()))?
            .set_default("timeout_seconds", 30)?
            .set_default("environment", "development")?
            .set_default("public_url.scheme", defaults.public_url.scheme)?
            .set_default("public_url.base_path", defaults.public_url.base_path)?
            .set_default("paging.default_limit", defaults.paging.default_limit)?
            .set_default("paging.max_limit", defaults.paging.max_limit)?
            .set_default("default_format", "json")?
            .set_default(
                "ephemeral.sweep_interval_seconds",
                defaults.ephemeral.sweep_interval_seconds,
            )?
            .set_default("metadata.title", defaults.metadata.title)?
            .set_default("metadata.description", defaults.metadata.description)?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name(&format!("config.{}", env_var.to_lowercase())).required(false))
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_var.to_lowercase())?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;
        server_config
            .paging
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid paging configuration: {e}")))?;

        Ok(server_config)
    }

    /// Create configuration optimized for testing
    pub fn for_testing() -> Self {
        Self {
            port: ServerPort::testing(),
            timeout_seconds: TimeoutSeconds::testing(),
            environment: Environment::Testing,
            ..Self::default()
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_validation() {
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(400).is_err());

        assert!(TimeoutSeconds::new(30).is_ok());
        assert!(TimeoutSeconds::new(1).is_ok());
        assert!(TimeoutSeconds::new(300).is_ok());
    }

    #[test]
    fn server_port_validation() {
        assert!(ServerPort::new(0, Environment::Testing).is_ok());
        assert!(ServerPort::new(0, Environment::Development).is_err());
        assert!(ServerPort::new(0, Environment::Production).is_err());

        assert!(ServerPort::new(9000, Environment::Development).is_ok());
        assert!(ServerPort::new(443, Environment::Production).is_ok());
    }

    #[test]
    fn paging_validation() {
        assert!(PagingSettings::default().validate().is_ok());
        let zero = PagingSettings {
            default_limit: 0,
            max_limit: 10,
        };
        assert!(zero.validate().is_err());
        let inverted = PagingSettings {
            default_limit: 50,
            max_limit: 10,
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn reaper_disabled_without_ttl() {
        assert_eq!(EphemeralConfig::default().reaper_settings(), None);
        let enabled = EphemeralConfig {
            idle_ttl_seconds: Some(600),
            sweep_interval_seconds: 0,
        };
        assert_eq!(
            enabled.reaper_settings(),
            Some((Duration::from_secs(600), Duration::from_secs(1)))
        );
    }

    #[test]
    fn testing_config() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.environment, Environment::Testing);
        assert_eq!(config.port.value(), 0);
        assert_eq!(config.paging, PagingSettings::default());
        assert_eq!(config.default_format, ContentFormat::Json);
    }

    #[test]
    fn environment_display() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Testing.to_string(), "testing");
    }
}
