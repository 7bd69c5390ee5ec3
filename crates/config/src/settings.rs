//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use stylist_core::PriceTiers;

use crate::constants::{endpoints, pricing, retrieval, workflow};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_retrieval()?;
        self.validate_workflow()?;
        self.validate_pricing()?;
        self.validate_server()?;
        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;

        if r.overfetch_factor < retrieval::MIN_OVERFETCH_FACTOR {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.overfetch_factor".to_string(),
                message: format!(
                    "Must be at least {}, got {}",
                    retrieval::MIN_OVERFETCH_FACTOR,
                    r.overfetch_factor
                ),
            });
        }

        if r.default_top_k == 0 || r.default_top_k > r.max_top_k {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.default_top_k".to_string(),
                message: format!(
                    "Must be between 1 and max_top_k ({}), got {}",
                    r.max_top_k, r.default_top_k
                ),
            });
        }

        if self.embedding.dimension == 0 {
            return Err(ConfigError::InvalidValue {
                field: "embedding.dimension".to_string(),
                message: "Must be positive".to_string(),
            });
        }

        Ok(())
    }

    fn validate_workflow(&self) -> Result<(), ConfigError> {
        if self.workflow.provider_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workflow.provider_timeout_ms".to_string(),
                message: "Must be positive".to_string(),
            });
        }

        if self.workflow.max_retries > 10 {
            return Err(ConfigError::InvalidValue {
                field: "workflow.max_retries".to_string(),
                message: format!("At most 10 retries allowed, got {}", self.workflow.max_retries),
            });
        }

        Ok(())
    }

    fn validate_pricing(&self) -> Result<(), ConfigError> {
        let p = &self.pricing;
        if p.budget_ceiling == 0 || p.budget_ceiling >= p.mid_ceiling {
            return Err(ConfigError::InvalidValue {
                field: "pricing".to_string(),
                message: format!(
                    "Tier ceilings must increase: budget {} < mid {}",
                    p.budget_ceiling, p.mid_ceiling
                ),
            });
        }
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "Must be positive".to_string(),
            });
        }

        if self.environment.is_production() && !self.server.cors_enabled {
            tracing::warn!("CORS disabled in production environment");
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle time before a session expires
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}
fn default_max_sessions() -> usize {
    1000
}
fn default_session_timeout() -> u64 {
    3600
}
fn default_cleanup_interval() -> u64 {
    300
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Nearest neighbours fetched per requested result
    #[serde(default = "default_overfetch")]
    pub overfetch_factor: usize,
}

fn default_top_k() -> usize {
    retrieval::DEFAULT_TOP_K
}
fn default_max_top_k() -> usize {
    retrieval::MAX_TOP_K
}
fn default_overfetch() -> usize {
    retrieval::OVERFETCH_FACTOR
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            overfetch_factor: default_overfetch(),
        }
    }
}

/// Workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Quality-driven re-retrievals per turn
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Timeout for each embedding or language-model call
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_ms: u64,

    #[serde(default = "default_history_capacity")]
    pub evaluation_history_capacity: usize,
}

fn default_max_retries() -> u32 {
    workflow::MAX_RETRIES
}
fn default_provider_timeout() -> u64 {
    workflow::PROVIDER_TIMEOUT_MS
}
fn default_history_capacity() -> usize {
    crate::constants::evaluation::HISTORY_CAPACITY
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            provider_timeout_ms: default_provider_timeout(),
            evaluation_history_capacity: default_history_capacity(),
        }
    }
}

/// Price tier ceilings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_budget_ceiling")]
    pub budget_ceiling: u32,

    #[serde(default = "default_mid_ceiling")]
    pub mid_ceiling: u32,
}

fn default_budget_ceiling() -> u32 {
    pricing::BUDGET_CEILING
}
fn default_mid_ceiling() -> u32 {
    pricing::MID_CEILING
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            budget_ceiling: default_budget_ceiling(),
            mid_ceiling: default_mid_ceiling(),
        }
    }
}

impl PricingConfig {
    pub fn tiers(&self) -> PriceTiers {
        PriceTiers {
            budget_ceiling: self.budget_ceiling,
            mid_ceiling: self.mid_ceiling,
        }
    }
}

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Hashed bag-of-words, no model needed
    #[default]
    Hash,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dim")]
    pub dimension: usize,
}

fn default_ollama_endpoint() -> String {
    endpoints::OLLAMA_DEFAULT.to_string()
}
fn default_embedding_model() -> String {
    "bge-m3".to_string()
}
fn default_embedding_dim() -> usize {
    retrieval::EMBEDDING_DIM
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            endpoint: default_ollama_endpoint(),
            model: default_embedding_model(),
            dimension: default_embedding_dim(),
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Use the LLM for intent extraction and response generation
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> usize {
    512
}
fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_ollama_endpoint(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Product catalog source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON/YAML file or a directory of them
    #[serde(default = "default_catalog_path")]
    pub path: String,

    /// Concurrent embedding requests while indexing
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,
}

fn default_catalog_path() -> String {
    "data/catalog".to_string()
}
fn default_embed_concurrency() -> usize {
    4
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            embed_concurrency: default_embed_concurrency(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/` and the environment
///
/// Priority: env vars > config/{env} > config/default > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit config directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(
        File::with_name(&dir.join("default").to_string_lossy()).required(false),
    );

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&dir.join(env_name).to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("STYLIST")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.workflow.max_retries, 2);
        assert_eq!(settings.retrieval.overfetch_factor, 3);
        assert_eq!(settings.embedding.provider, EmbeddingProviderKind::Hash);
        assert!(!settings.llm.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_overfetch_validation() {
        let mut settings = Settings::default();
        settings.retrieval.overfetch_factor = 2;
        assert!(settings.validate().is_err());

        settings.retrieval.overfetch_factor = 4;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_top_k_validation() {
        let mut settings = Settings::default();
        settings.retrieval.default_top_k = 0;
        assert!(settings.validate().is_err());

        settings.retrieval.default_top_k = settings.retrieval.max_top_k + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_pricing_validation() {
        let mut settings = Settings::default();
        settings.pricing.budget_ceiling = 80_000;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("pricing"));
    }

    #[test]
    fn test_timeout_validation() {
        let mut settings = Settings::default();
        settings.workflow.provider_timeout_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "server:\n  port: 9100\nworkflow:\n  max_retries: 3\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.yaml"),
            "embedding:\n  provider: ollama\n",
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.workflow.max_retries, 3);
        assert_eq!(settings.embedding.provider, EmbeddingProviderKind::Ollama);
        // Untouched sections keep their defaults
        assert_eq!(settings.pricing.budget_ceiling, 30_000);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "retrieval:\n  overfetch_factor: 1\n",
        )
        .unwrap();
        assert!(load_settings_from(dir.path(), None).is_err());
    }

    #[test]
    fn test_pricing_tiers_conversion() {
        let tiers = PricingConfig::default().tiers();
        assert_eq!(tiers.budget_ceiling, 30_000);
        assert_eq!(tiers.mid_ceiling, 70_000);
    }
}
