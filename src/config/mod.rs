use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{validate_key_segment, CART_SNAPSHOT_KEY};

const ENV_PREFIX: &str = "LAUNDRY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout_seconds: u64,
}

/// Where cart snapshots are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Memory,
    #[serde(alias = "dynamo")]
    DynamoDb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend", rename = "storage_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
    #[serde(default = "default_origin")]
    pub default_origin: String,
    #[serde(default = "default_snapshots_table")]
    pub snapshots_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    /// Load configuration from `LAUNDRY_*` environment variables
    pub fn from_environment() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to read environment: {}", e),
            })?;

        Self::from_settings(settings)
    }

    /// Build configuration from an already assembled settings tree
    pub fn from_settings(settings: config::Config) -> Result<Self, ConfigError> {
        let config = Config {
            server: deserialize_section(&settings, "server")?,
            storage: deserialize_section(&settings, "storage")?,
            observability: deserialize_section(&settings, "observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        if self.server.session_idle_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Session idle timeout cannot be 0".to_string(),
            });
        }

        validate_key_segment("snapshot_key", &self.storage.snapshot_key).map_err(|e| {
            ConfigError::ValidationError {
                message: e.to_string(),
            }
        })?;

        validate_key_segment("default_origin", &self.storage.default_origin).map_err(|e| {
            ConfigError::ValidationError {
                message: e.to_string(),
            }
        })?;

        if self.storage.backend == StorageBackend::DynamoDb
            && self.storage.snapshots_table_name.is_empty()
        {
            return Err(ConfigError::ValidationError {
                message: "Snapshots table name cannot be empty".to_string(),
            });
        }

        if self.storage.backend == StorageBackend::File && self.storage.data_dir.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Data directory cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn deserialize_section<T: for<'de> Deserialize<'de>>(
    settings: &config::Config,
    section: &str,
) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_seconds)
    }

    /// How often idle sessions are looked for: a quarter of the idle
    /// timeout, between one second and one minute
    pub fn session_reap_interval(&self) -> Duration {
        Duration::from_secs((self.session_idle_timeout_seconds / 4).clamp(1, 60))
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_session_idle_timeout() -> u64 {
    1800
}

pub(crate) fn default_storage_backend() -> StorageBackend {
    StorageBackend::File
}

pub(crate) fn default_data_dir() -> String {
    "./data".to_string()
}

pub(crate) fn default_snapshot_key() -> String {
    CART_SNAPSHOT_KEY.to_string()
}

pub(crate) fn default_origin() -> String {
    "default".to_string()
}

pub(crate) fn default_snapshots_table() -> String {
    "LaundryCartSnapshots".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_service_name() -> String {
    "laundry-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
