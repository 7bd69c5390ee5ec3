//! Text Embeddings
//!
//! Deterministic hashed bag-of-words embeddings. No model download, stable
//! across processes, and good enough for keyword-heavy product text.

use async_trait::async_trait;

use stylist_config::constants::retrieval;
use stylist_config::EmbeddingSettings;
use stylist_core::EmbeddingProvider;
use stylist_text_processing::tokenize;

/// Embedding configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Embedding dimension
    pub embedding_dim: usize,
    /// L2-normalize embeddings
    pub normalize: bool,
    /// Weight of in-word character bigrams relative to whole words
    pub subword_weight: f32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: retrieval::EMBEDDING_DIM,
            normalize: true,
            subword_weight: 0.5,
        }
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            embedding_dim: settings.dimension,
            ..Default::default()
        }
    }
}

/// Hashing embedder (FNV-1a into fixed buckets)
///
/// Words and in-word character bigrams are hashed separately so Korean
/// stems still overlap when particles differ ("반팔을" vs "반팔").
#[derive(Debug, Clone, Default)]
pub struct HashEmbedder {
    config: EmbeddingConfig,
}

impl HashEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let dim = self.config.embedding_dim.max(1);
        let mut embedding = vec![0.0f32; dim];

        for word in tokenize::words(text) {
            embedding[bucket(&word, dim)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            if chars.len() > 2 {
                for pair in chars.windows(2) {
                    let gram: String = pair.iter().collect();
                    embedding[bucket(&format!("#{}", gram), dim)] += self.config.subword_weight;
                }
            }
        }

        if self.config.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut embedding {
                    *v /= norm;
                }
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> stylist_core::Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dim
    }

    fn name(&self) -> &str {
        "hash"
    }
}

fn bucket(token: &str, dim: usize) -> usize {
    (fnv1a(token.as_bytes()) % dim as u64) as usize
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// Cosine similarity; 0 when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder_normalized() {
        let embedder = HashEmbedder::default();
        let embedding = embedder.embed_sync("스트릿 오버핏 반팔 티셔츠");

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.embed_sync("베이직 셔츠"), embedder.embed_sync("베이직 셔츠"));
    }

    #[test]
    fn test_related_text_is_closer() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_sync("스트릿 반팔");
        let close = embedder.embed_sync("스트릿 감성 반팔 티셔츠");
        let far = embedder.embed_sync("가죽 로퍼");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text() {
        let embedder = HashEmbedder::default();
        let embedding = embedder.embed_sync("");
        assert!(embedding.iter().all(|v| *v == 0.0));
        assert_eq!(cosine_similarity(&embedding, &embedding), 0.0);
    }

    #[tokio::test]
    async fn test_provider_trait() {
        let embedder = HashEmbedder::new(EmbeddingConfig {
            embedding_dim: 64,
            ..Default::default()
        });
        let v = embedder.embed("니트").await.unwrap();
        assert_eq!(v.len(), 64);
        assert_eq!(embedder.dimension(), 64);
    }
}
