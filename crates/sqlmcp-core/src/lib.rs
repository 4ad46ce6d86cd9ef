//! # sqlmcp-core
//!
//! Configuration types shared by the sqlmcp crates.

pub mod config;

pub use config::{
    ConfigError, ConfigOverrides, HttpConfig, LimitsConfig, LoggingConfig, ServerConfig,
};
