//! Hybrid Retriever
//!
//! Vector nearest-neighbour search over-fetched by `overfetch_factor`,
//! metadata filters as hard predicates, then the hybrid score.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use stylist_config::constants::{retrieval, workflow};
use stylist_config::Settings;
use stylist_core::{EmbeddingProvider, PriceTiers, Recommendation, SearchFilters};

use crate::index::{IndexHandle, ProductIndex};
use crate::scoring::{compare_recommendations, recommend, ScoreWeights};
use crate::stats::SearchStats;
use crate::RagError;

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Neighbours fetched per requested result
    pub overfetch_factor: usize,
    pub tiers: PriceTiers,
    pub weights: ScoreWeights,
    /// Bound on the query embedding call of a direct search
    pub provider_timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            default_top_k: retrieval::DEFAULT_TOP_K,
            max_top_k: retrieval::MAX_TOP_K,
            overfetch_factor: retrieval::OVERFETCH_FACTOR,
            tiers: PriceTiers::default(),
            weights: ScoreWeights::default(),
            provider_timeout: Duration::from_millis(workflow::PROVIDER_TIMEOUT_MS),
        }
    }
}

impl From<&Settings> for RetrieverConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            default_top_k: settings.retrieval.default_top_k,
            max_top_k: settings.retrieval.max_top_k,
            overfetch_factor: settings
                .retrieval
                .overfetch_factor
                .max(retrieval::MIN_OVERFETCH_FACTOR),
            tiers: settings.pricing.tiers(),
            weights: ScoreWeights::default(),
            provider_timeout: Duration::from_millis(settings.workflow.provider_timeout_ms),
        }
    }
}

impl RetrieverConfig {
    /// Candidate pool size; each widen step doubles it
    pub fn pool_size(&self, top_k: usize, widen_steps: u32) -> usize {
        let factor = self.overfetch_factor.max(retrieval::MIN_OVERFETCH_FACTOR);
        top_k
            .saturating_mul(factor)
            .saturating_mul(1usize << widen_steps.min(16))
    }
}

/// Direct search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Recommendation>,
    pub total_results: usize,
    /// Seconds
    pub search_time: f64,
}

/// Rank one index snapshot against a query vector
///
/// Pure and deterministic for a fixed snapshot: this is the whole retrieval
/// algorithm minus the embedding call.
pub fn rank(
    index: &ProductIndex,
    query_embedding: &[f32],
    filters: &SearchFilters,
    top_k: usize,
    pool_size: usize,
    config: &RetrieverConfig,
) -> Result<Vec<Recommendation>, RagError> {
    if top_k == 0 || index.is_empty() {
        return Ok(Vec::new());
    }

    let neighbors = index.nearest(query_embedding, pool_size.max(top_k))?;
    let candidates = neighbors.len();

    let mut ranked: Vec<Recommendation> = neighbors
        .into_iter()
        .filter_map(|n| {
            let product = &index.products()[n.position];
            filters
                .matches(product, &config.tiers)
                .then(|| recommend(&config.weights, product, n.similarity))
        })
        .collect();

    ranked.sort_by(compare_recommendations);
    ranked.truncate(top_k);

    tracing::debug!(
        candidates,
        returned = ranked.len(),
        filters = filters.active_keys().len(),
        "Ranked candidates"
    );

    Ok(ranked)
}

/// Hybrid retriever over a swappable index
pub struct HybridRetriever {
    config: RetrieverConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<IndexHandle>,
    stats: SearchStats,
}

impl HybridRetriever {
    pub fn new(
        config: RetrieverConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<IndexHandle>,
    ) -> Self {
        Self {
            config,
            embedder,
            index,
            stats: SearchStats::new(),
        }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Query embedding; the only suspension point of a retrieval
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        self.embedder
            .embed(query)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))
    }

    /// Rank the current snapshot against an already-computed query vector
    pub fn retrieve_embedding(
        &self,
        query_embedding: &[f32],
        filters: &SearchFilters,
        top_k: usize,
        widen_steps: u32,
    ) -> Result<Vec<Recommendation>, RagError> {
        let top_k = top_k.min(self.config.max_top_k);
        let snapshot = self.index.snapshot();
        rank(
            &snapshot,
            query_embedding,
            filters,
            top_k,
            self.config.pool_size(top_k, widen_steps),
            &self.config,
        )
    }

    /// Embed `query` and rank
    pub async fn retrieve(
        &self,
        query: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<Recommendation>, RagError> {
        let embedding = self.embed_query(query).await?;
        self.retrieve_embedding(&embedding, filters, top_k, 0)
    }

    /// Direct search bypassing conversation analysis
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, RagError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidQuery("query must not be empty".to_string()));
        }

        let top_k = request.top_k.unwrap_or(self.config.default_top_k);
        if top_k == 0 || top_k > self.config.max_top_k {
            return Err(RagError::InvalidQuery(format!(
                "top_k must be between 1 and {}, got {}",
                self.config.max_top_k, top_k
            )));
        }

        let mut filters = SearchFilters::new();
        if let Some(ref category) = request.category {
            if !category.trim().is_empty() {
                filters = filters.category(category.trim());
            }
        }
        if let Some(min_rating) = request.min_rating {
            filters = filters.min_rating(min_rating);
        }
        filters
            .validate()
            .map_err(|e| RagError::InvalidQuery(e.to_string()))?;

        let start = Instant::now();
        let embedding = tokio::time::timeout(self.config.provider_timeout, self.embed_query(query))
            .await
            .map_err(|_| {
                RagError::Embedding(format!(
                    "embedding timed out after {}ms",
                    self.config.provider_timeout.as_millis()
                ))
            })??;
        let results = self.retrieve_embedding(&embedding, &filters, top_k, 0)?;
        let elapsed = start.elapsed();

        self.stats.record(elapsed);
        metrics::histogram!("stylist_search_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            query = %query,
            results = results.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Search completed"
        );

        Ok(SearchResponse {
            total_results: results.len(),
            results,
            search_time: elapsed.as_secs_f64(),
        })
    }
}
