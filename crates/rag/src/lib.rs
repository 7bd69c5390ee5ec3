//! Product retrieval
//!
//! Features:
//! - Swappable in-memory vector index over the catalog
//! - Hybrid scoring of similarity, rating and review volume
//! - Hard metadata filters applied after an over-fetched vector search
//! - Hash and Ollama embedding providers
//! - Catalog loading from YAML/JSON with background reindex
//! - Trending, category browse and query suggestions

pub mod browse;
pub mod catalog;
pub mod embeddings;
pub mod index;
pub mod ollama_embeddings;
pub mod retriever;
pub mod scoring;
pub mod stats;

pub use catalog::{CatalogFile, CatalogLoader, LoadReport};
pub use embeddings::{cosine_similarity, EmbeddingConfig, HashEmbedder};
pub use index::{CategoryCount, IndexHandle, Neighbor, ProductIndex};
pub use ollama_embeddings::{OllamaEmbedder, OllamaEmbeddingConfig};
pub use retriever::{rank, HybridRetriever, RetrieverConfig, SearchRequest, SearchResponse};
pub use scoring::{ScoreBreakdown, ScoreTerm, ScoreWeights};
pub use stats::{SearchStats, SearchStatsSnapshot};

use thiserror::Error;

/// Retrieval errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for stylist_core::Error {
    fn from(err: RagError) -> Self {
        let message = err.to_string();
        match err {
            RagError::Embedding(_) | RagError::Connection(_) => stylist_core::Error::Provider(message),
            RagError::Index(_) | RagError::DimensionMismatch { .. } => {
                stylist_core::Error::Retrieval(message)
            },
            RagError::Catalog(_) | RagError::InvalidQuery(_) => stylist_core::Error::Validation(message),
            RagError::NotFound(_) => stylist_core::Error::NotFound(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylist_core::ErrorKind;

    #[test]
    fn test_error_kinds() {
        let provider: stylist_core::Error = RagError::Embedding("down".into()).into();
        assert_eq!(provider.kind(), ErrorKind::Provider);

        let retrieval: stylist_core::Error =
            RagError::DimensionMismatch { expected: 384, actual: 3 }.into();
        assert_eq!(retrieval.kind(), ErrorKind::Retrieval);

        let validation: stylist_core::Error = RagError::InvalidQuery("empty".into()).into();
        assert_eq!(validation.kind(), ErrorKind::Validation);
    }
}
