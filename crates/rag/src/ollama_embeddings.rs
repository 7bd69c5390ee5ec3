//! Ollama Embeddings
//!
//! Uses Ollama's embedding API (`POST /api/embed`) for dense vectors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use stylist_config::EmbeddingSettings;
use stylist_core::EmbeddingProvider;

use crate::RagError;

/// Ollama embedding configuration
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingConfig {
    /// Ollama API endpoint
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Embedding dimension
    pub embedding_dim: usize,
    /// HTTP timeout
    pub timeout: Duration,
}

impl Default for OllamaEmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "bge-m3".to_string(),
            embedding_dim: 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&EmbeddingSettings> for OllamaEmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            embedding_dim: settings.dimension,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama embedder
pub struct OllamaEmbedder {
    client: Client,
    config: OllamaEmbeddingConfig,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaEmbeddingConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn embed_raw(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: texts.to_vec(),
        };

        let url = format!("{}/api/embed", self.config.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "Ollama embedding failed: {} - {}",
                status, text
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if embed_response.embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embed_response.embeddings.len()
            )));
        }

        if let Some(bad) = embed_response
            .embeddings
            .iter()
            .find(|e| e.len() != self.config.embedding_dim)
        {
            return Err(RagError::DimensionMismatch {
                expected: self.config.embedding_dim,
                actual: bad.len(),
            });
        }

        Ok(embed_response.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> stylist_core::Result<Vec<f32>> {
        let mut embeddings = self.embed_raw(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()).into())
    }

    async fn embed_batch(&self, texts: &[String]) -> stylist_core::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        Ok(self.embed_raw(&refs).await?)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dim
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
