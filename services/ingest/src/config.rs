//! Configuration management for the reading ingest service.
//!
//! This module handles loading and validating configuration from environment
//! variables and configuration files. Every field has a default so the
//! service starts with no configuration at all, which is how it runs on the
//! field rig.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use vireo_readings::DEFAULT_DATA_FILE;

/// Main configuration for the ingest service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Reading store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics export configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind the listener to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Reading store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON log file readings are appended to
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Metrics export configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus metrics exporter
    #[serde(default)]
    pub enabled: bool,

    /// Port for the metrics HTTP endpoint
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_data_file() -> String {
    DEFAULT_DATA_FILE.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl IngestConfig {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. System-wide config (/etc/vireo/ingest.toml)
    /// 2. Local config (config/ingest.toml)
    /// 3. Environment variables (prefixed with VIREO_)
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with the system-wide config
            .add_source(File::with_name("/etc/vireo/ingest").required(false))
            // Add the local config
            .add_source(File::with_name("config/ingest").required(false))
            // Override with environment variables (e.g., VIREO_HTTP__PORT)
            .add_source(
                Environment::with_prefix("VIREO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Create configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("VIREO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.http.host.is_empty() {
            return Err(ConfigValidationError::MissingField("http.host".to_string()));
        }

        if self.store.data_file.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "store.data_file".to_string(),
            ));
        }

        if self.metrics.enabled && self.metrics.port == self.http.port {
            return Err(ConfigValidationError::InvalidValue {
                field: "metrics.port".to_string(),
                message: "Metrics port must differ from the HTTP port".to_string(),
            });
        }

        Ok(())
    }

    /// Address the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
