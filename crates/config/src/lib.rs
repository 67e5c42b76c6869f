//! Configuration management for the diagnostic assistant
//!
//! Supports loading configuration from:
//! - YAML files under `config/`
//! - Environment variables (`DIAG_ASSIST__` prefix, `__` separator)
//!
//! The content catalog (steps, redirects, triage checklist, escalation) is a
//! separate YAML document loaded through [`load_catalog`].

pub mod catalog;
pub mod constants;
pub mod settings;

pub use catalog::{load_catalog, parse_catalog, validate_catalog, CatalogError};
pub use settings::{
    load_settings, load_settings_from, FlowConfig, ObservabilityConfig, RuntimeEnvironment,
    ServerConfig, Settings, TimingConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingField(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}
