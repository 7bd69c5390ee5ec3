//! Language model integration
//!
//! Features:
//! - Ollama chat backend behind the [`LlmBackend`] trait
//! - LLM intent extraction with rule-based fallback
//! - LLM response lead-ins with template fallback

pub mod backend;
pub mod generator;
pub mod intent;
pub mod prompt;

pub use backend::{FinishReason, GenerationResult, LlmBackend, LlmConfig, OllamaBackend};
pub use generator::LlmResponseGenerator;
pub use intent::LlmIntentExtractor;
pub use prompt::{describe_filters, Message, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for stylist_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(msg) => stylist_core::Error::Config(msg),
            other => stylist_core::Error::Provider(other.to_string()),
        }
    }
}
