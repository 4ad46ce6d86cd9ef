//! Configuration types for the sqlmcp server.
//!
//! Configuration can be loaded from a YAML file (`sqlmcp.yaml`) and then
//! overridden field by field from the command line. Every field has a
//! default, so an empty file (or no file) is a valid configuration.
//!
//! ```yaml
//! http:
//!   host: 0.0.0.0
//!   port: 9999
//! limits:
//!   max_query_time_secs: 60
//!   max_result_rows: 10000
//! logging:
//!   level: info
//! database: ./data/app.db
//! ```

pub mod http;
pub mod limits;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use http::HttpConfig;
pub use limits::LimitsConfig;

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Per-call execution limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database bound at startup, before any `connect_database` call.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Whether the server was started detached from a terminal.
    #[serde(default)]
    pub daemon: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level directive (`error`, `warn`, `info`, `debug`, `trace`).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values taken from the command line. `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub max_connections: Option<usize>,
    pub max_query_time_secs: Option<u64>,
    pub max_result_rows: Option<usize>,
    pub database: Option<PathBuf>,
    pub daemon: bool,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded values.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(host) = overrides.host {
            self.http.host = host;
        }
        if let Some(port) = overrides.port {
            self.http.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(max) = overrides.max_connections {
            self.http.max_connections = max;
        }
        if let Some(secs) = overrides.max_query_time_secs {
            self.limits.max_query_time_secs = secs;
        }
        if let Some(rows) = overrides.max_result_rows {
            self.limits.max_result_rows = rows;
        }
        if overrides.database.is_some() {
            self.database = overrides.database;
        }
        self.daemon |= overrides.daemon;
        self.validate()?;
        Ok(self)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.max_connections == 0 {
            return Err(ConfigError::Config(
                "http.max_connections must be at least 1".to_string(),
            ));
        }
        if self.limits.max_query_time_secs == 0 {
            return Err(ConfigError::Config(
                "limits.max_query_time_secs must be at least 1".to_string(),
            ));
        }
        if self.limits.max_result_rows == 0 {
            return Err(ConfigError::Config(
                "limits.max_result_rows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
