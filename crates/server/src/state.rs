//! Application State
//!
//! Shared state across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stylist_agent::{Orchestrator, QualityEvaluator, WorkflowComponents, WorkflowConfig};
use stylist_config::{load_settings, EmbeddingProviderKind, Settings};
use stylist_core::{EmbeddingProvider, IntentExtractor, ResponseGenerator};
use stylist_llm::{LlmBackend, LlmConfig, LlmIntentExtractor, LlmResponseGenerator, OllamaBackend};
use stylist_rag::{
    CatalogLoader, EmbeddingConfig, HashEmbedder, HybridRetriever, IndexHandle, LoadReport,
    OllamaEmbedder, OllamaEmbeddingConfig, RetrieverConfig,
};
use stylist_text_processing::{RuleBasedIntentExtractor, TemplateResponseGenerator};

use crate::session::SessionManager;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration wrapped in RwLock for hot-reload support
    pub config: Arc<RwLock<Settings>>,
    pub sessions: Arc<SessionManager>,
    pub orchestrator: Arc<Orchestrator>,
    /// Concrete evaluator, kept for the history summary
    pub evaluator: Arc<QualityEvaluator>,
    pub loader: Arc<CatalogLoader>,
    /// Present when the language model is enabled
    pub llm: Option<Arc<dyn LlmBackend>>,
    pub metrics: Option<PrometheusHandle>,
    /// Environment name for config reload
    env: Option<String>,
}

impl AppState {
    /// Build providers and the workflow from settings, starting on an empty
    /// index. Call [`AppState::reindex`] to load the catalog.
    pub fn new(config: Settings, env: Option<String>) -> Result<Self, ServerError> {
        let embedder = build_embedder(&config)?;
        let llm = build_llm(&config)?;
        Self::with_providers(config, env, embedder, llm)
    }

    /// Build the workflow around caller-supplied providers
    pub fn with_providers(
        config: Settings,
        env: Option<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Option<Arc<dyn LlmBackend>>,
    ) -> Result<Self, ServerError> {
        let (intent, generator): (Arc<dyn IntentExtractor>, Arc<dyn ResponseGenerator>) =
            match llm {
                Some(ref backend) => (
                    Arc::new(LlmIntentExtractor::new(Arc::clone(backend))),
                    Arc::new(LlmResponseGenerator::new(Arc::clone(backend))),
                ),
                None => (
                    Arc::new(RuleBasedIntentExtractor::new()),
                    Arc::new(TemplateResponseGenerator::new()),
                ),
            };

        let index = Arc::new(IndexHandle::empty(embedder.dimension()));
        let retriever = Arc::new(HybridRetriever::new(
            RetrieverConfig::from(&config),
            Arc::clone(&embedder),
            index,
        ));
        let evaluator = Arc::new(QualityEvaluator::new(
            config.workflow.evaluation_history_capacity,
        ));

        let orchestrator = Orchestrator::new(
            WorkflowComponents {
                intent,
                retriever,
                evaluator: evaluator.clone(),
                generator,
            },
            WorkflowConfig::from(&config),
        )?;

        let sessions = SessionManager::with_config(
            config.server.max_sessions,
            Duration::from_secs(config.server.session_timeout_secs),
            Duration::from_secs(config.server.cleanup_interval_secs),
        );
        let loader = CatalogLoader::new(embedder, config.catalog.embed_concurrency);

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            sessions: Arc::new(sessions),
            orchestrator: Arc::new(orchestrator),
            evaluator,
            loader: Arc::new(loader),
            llm,
            metrics: None,
            env,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn retriever(&self) -> &Arc<HybridRetriever> {
        self.orchestrator.retriever()
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        self.retriever().index()
    }

    /// Reload configuration from files
    ///
    /// Providers and the workflow keep the settings they were built with; the
    /// reload affects the catalog path and request validation limits.
    pub fn reload_config(&self) -> Result<(), String> {
        let new_config = load_settings(self.env.as_deref())
            .map_err(|e| format!("Failed to reload config: {}", e))?;

        *self.config.write() = new_config;

        tracing::info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Get a read guard to the current configuration
    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }

    /// Rebuild the index from the configured catalog path and swap it in
    ///
    /// On failure the current index keeps serving.
    pub async fn reindex(&self) -> Result<LoadReport, ServerError> {
        let path = PathBuf::from(&self.get_config().catalog.path);
        let report = self.loader.reindex(&path, self.index()).await?;
        metrics::counter!("stylist_reindex_total").increment(1);
        Ok(report)
    }
}

fn build_embedder(config: &Settings) -> Result<Arc<dyn EmbeddingProvider>, ServerError> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding.provider {
        EmbeddingProviderKind::Hash => {
            Arc::new(HashEmbedder::new(EmbeddingConfig::from(&config.embedding)))
        },
        EmbeddingProviderKind::Ollama => Arc::new(OllamaEmbedder::new(
            OllamaEmbeddingConfig::from(&config.embedding),
        )?),
    };
    tracing::info!(
        provider = %embedder.name(),
        dimension = embedder.dimension(),
        "Embedding provider ready"
    );
    Ok(embedder)
}

fn build_llm(config: &Settings) -> Result<Option<Arc<dyn LlmBackend>>, ServerError> {
    if !config.llm.enabled {
        tracing::info!("Language model disabled, using rule-based analysis and templates");
        return Ok(None);
    }
    let backend = OllamaBackend::new(LlmConfig::from(&config.llm))?;
    tracing::info!(model = %backend.model_name(), "Language model backend ready");
    Ok(Some(Arc::new(backend)))
}
