//! Configuration management for the recommendation engine
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (STYLIST_ prefix, `__` as the section separator)

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, CatalogConfig, EmbeddingProviderKind, EmbeddingSettings,
    LlmSettings, ObservabilityConfig, PricingConfig, RetrievalConfig, RuntimeEnvironment,
    ServerConfig, Settings, WorkflowConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingField(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

impl From<ConfigError> for stylist_core::Error {
    fn from(err: ConfigError) -> Self {
        stylist_core::Error::Config(err.to_string())
    }
}
