//! LLM backend
//!
//! Non-streaming chat completion against an Ollama server. Calls are made
//! once; the workflow decides what to do when one fails.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use stylist_config::LlmSettings;

use crate::prompt::Message;
use crate::LlmError;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    /// Request timeout
    pub timeout: Duration,
    /// How long Ollama keeps the model loaded after a call ("5m", "-1", ...)
    pub keep_alive: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:7b-instruct".to_string(),
            endpoint: stylist_config::constants::endpoints::OLLAMA_DEFAULT.to_string(),
            max_tokens: 512,
            temperature: 0.3,
            top_p: 0.9,
            timeout: Duration::from_secs(30),
            keep_alive: "5m".to_string(),
        }
    }
}

impl From<&LlmSettings> for LlmConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_secs),
            ..Default::default()
        }
    }
}

impl LlmConfig {
    /// Same backend with a different sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// LLM generation result
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    /// Tokens generated
    pub tokens: usize,
    pub total_time_ms: u64,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a response
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError>;

    /// Check if model is available
    async fn is_available(&self) -> bool;

    fn model_name(&self) -> &str;
}

/// Ollama `/api/chat` backend
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    fn chat_request(&self, messages: &[Message]) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(self.config.temperature),
                top_p: Some(self.config.top_p),
                num_predict: Some(self.config.max_tokens as i32),
            }),
            keep_alive: Some(self.config.keep_alive.clone()),
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();
        let request = self.chat_request(messages);

        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{}: {}", status, error)));
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let result = GenerationResult {
            text: body.message.content,
            tokens: body.eval_count.unwrap_or(0) as usize,
            total_time_ms: start.elapsed().as_millis() as u64,
            finish_reason: if body.done {
                FinishReason::Stop
            } else {
                FinishReason::Length
            },
        };

        tracing::debug!(
            model = %self.config.model,
            tokens = result.tokens,
            elapsed_ms = result.total_time_ms,
            "LLM generation complete"
        );

        Ok(result)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    done: bool,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Role;

    #[test]
    fn test_config_from_settings() {
        let settings = LlmSettings {
            endpoint: "http://ollama:11434/".to_string(),
            model: "gemma2".to_string(),
            timeout_secs: 5,
            ..Default::default()
        };
        let config = LlmConfig::from(&settings);
        assert_eq!(config.endpoint, "http://ollama:11434");
        assert_eq!(config.model, "gemma2");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_message_conversion() {
        let msg = Message {
            role: Role::User,
            content: "반팔 추천해줘".to_string(),
        };
        let ollama_msg: OllamaMessage = (&msg).into();
        assert_eq!(ollama_msg.role, "user");
        assert_eq!(ollama_msg.content, "반팔 추천해줘");
    }

    #[test]
    fn test_request_serialization() {
        let backend = OllamaBackend::new(LlmConfig::default()).unwrap();
        let request = backend.chat_request(&[Message::system("s"), Message::user("u")]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["keep_alive"], "5m");
        assert_eq!(json["options"]["num_predict"], 512);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"model":"m","message":{"role":"assistant","content":"안녕하세요"},"done":true,"eval_count":7}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.content, "안녕하세요");
        assert_eq!(parsed.eval_count, Some(7));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let backend = OllamaBackend::new(config).unwrap();
        assert!(!backend.is_available().await);
        assert!(backend.generate(&[Message::user("hi")]).await.is_err());
    }
}
