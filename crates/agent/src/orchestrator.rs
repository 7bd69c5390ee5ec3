//! Workflow orchestrator
//!
//! One run per user turn over a fixed transition table:
//!
//! ```text
//! Analyze ──► Retrieve ──► Evaluate ──► Respond
//!    │           ▲  │          │
//!    │           │  └─► Respond└──► Retrieve (quality retry)
//!    └─► HandleFeedback ──► Retrieve | Respond
//! ```
//!
//! Each step reads the current [`SessionState`] and returns a [`StateDelta`]
//! plus the next step; the run loop folds the delta into a new state value.
//! A component failure is caught by the step that called it and turns into a
//! transition to `Respond` carrying an [`ErrorInfo`]. `Respond` always
//! produces a message.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use stylist_config::constants::{retrieval, workflow};
use stylist_config::Settings;
use stylist_core::{
    Adjustment, Error, ErrorInfo, ErrorKind, EvaluationResult, FeedbackKind, FilterKey, Intent,
    IntentExtractor, PriceTiers, QualityLevel, Recommendation, ResponseGenerator, Result,
    RunOverrides, SearchFilters, SessionContext, SessionState, StateDelta, WorkflowStep,
};
use stylist_rag::HybridRetriever;
use stylist_text_processing::TemplateResponseGenerator;

use crate::evaluator::{EvaluationContext, RecommendationEvaluator};
use crate::feedback::{apply_feedback, FeedbackContext, FeedbackInterpreter};
use crate::response;
use crate::AgentError;

/// Filters a quality retry may drop, in the order they are dropped
const SOFT_FILTERS: &[FilterKey] = &[FilterKey::Color, FilterKey::Style, FilterKey::MinRating];

/// Orchestrator limits
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Quality-driven re-retrievals allowed per run
    pub max_retries: u32,
    /// Bound on every embedding and language-model call
    pub provider_timeout: Duration,
    pub default_top_k: usize,
    pub tiers: PriceTiers,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: workflow::MAX_RETRIES,
            provider_timeout: Duration::from_millis(workflow::PROVIDER_TIMEOUT_MS),
            default_top_k: retrieval::DEFAULT_TOP_K,
            tiers: PriceTiers::default(),
        }
    }
}

impl From<&Settings> for WorkflowConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            max_retries: settings.workflow.max_retries,
            provider_timeout: Duration::from_millis(settings.workflow.provider_timeout_ms),
            default_top_k: settings.retrieval.default_top_k,
            tiers: settings.pricing.tiers(),
        }
    }
}

/// Why the run moved between two steps
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum TransitionReason {
    RecommendationRequested,
    FeedbackReceived,
    NoActionNeeded,
    Retrieved { count: usize },
    QualityAccepted(QualityLevel),
    QualityRetry { retry_count: u32 },
    RetryBudgetExhausted,
    FeedbackRetrieval(FeedbackKind),
    FeedbackAcknowledged(FeedbackKind),
    ComponentFailed(ErrorKind),
}

/// One edge taken by a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub from: WorkflowStep,
    pub to: WorkflowStep,
    pub reason: TransitionReason,
}

/// Result of one workflow run
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// State as `Respond` left it
    pub state: SessionState,
    /// Session context to commit
    pub context: SessionContext,
    pub transitions: Vec<Transition>,
    pub elapsed: Duration,
}

impl TurnOutcome {
    pub fn response(&self) -> &str {
        self.state.final_response.as_deref().unwrap_or_default()
    }

    /// Number of times the run entered `Retrieve`
    pub fn retrievals(&self) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.to == WorkflowStep::Retrieve)
            .count()
    }
}

/// Capabilities the workflow drives
#[derive(Clone)]
pub struct WorkflowComponents {
    pub intent: Arc<dyn IntentExtractor>,
    pub retriever: Arc<HybridRetriever>,
    pub evaluator: Arc<dyn RecommendationEvaluator>,
    pub generator: Arc<dyn ResponseGenerator>,
}

/// Delta, next step and reason produced by one step
struct StepOutcome {
    delta: StateDelta,
    next: WorkflowStep,
    reason: TransitionReason,
}

impl StepOutcome {
    fn to(next: WorkflowStep, reason: TransitionReason, delta: StateDelta) -> Self {
        Self {
            delta,
            next,
            reason,
        }
    }

    fn failed(err: &Error, step: WorkflowStep) -> Self {
        tracing::warn!(step = %step, error = %err, "Workflow step failed");
        metrics::counter!("stylist_errors_total", "step" => step.display_name()).increment(1);
        Self::to(
            WorkflowStep::Respond,
            TransitionReason::ComponentFailed(err.kind()),
            StateDelta::error(ErrorInfo::from_error(err, step)),
        )
    }
}

/// Attempt kept while the quality loop runs
struct Attempt {
    recommendations: Vec<Recommendation>,
    evaluation: EvaluationResult,
}

/// Run-local scratch data; never shared across runs
#[derive(Default)]
struct RunScratch {
    query_embedding: Option<Vec<f32>>,
    best: Option<Attempt>,
}

pub struct Orchestrator {
    components: WorkflowComponents,
    feedback: FeedbackInterpreter,
    template: TemplateResponseGenerator,
    config: WorkflowConfig,
}

impl Orchestrator {
    pub fn new(
        components: WorkflowComponents,
        config: WorkflowConfig,
    ) -> std::result::Result<Self, AgentError> {
        if config.provider_timeout.is_zero() {
            return Err(AgentError::Configuration(
                "provider timeout must be positive".to_string(),
            ));
        }
        if config.default_top_k == 0 {
            return Err(AgentError::Configuration(
                "default top_k must be positive".to_string(),
            ));
        }

        tracing::info!(
            intent = %components.intent.name(),
            evaluator = %components.evaluator.name(),
            generator = %components.generator.name(),
            max_retries = config.max_retries,
            timeout_ms = config.provider_timeout.as_millis() as u64,
            "Workflow orchestrator ready"
        );

        Ok(Self {
            feedback: FeedbackInterpreter::new(config.tiers),
            template: TemplateResponseGenerator::new(),
            components,
            config,
        })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn retriever(&self) -> &Arc<HybridRetriever> {
        &self.components.retriever
    }

    pub fn evaluator(&self) -> &Arc<dyn RecommendationEvaluator> {
        &self.components.evaluator
    }

    pub fn feedback(&self) -> &FeedbackInterpreter {
        &self.feedback
    }

    /// Run one turn with the default result count
    pub async fn run(&self, input: &str, context: &SessionContext) -> TurnOutcome {
        self.run_with_top_k(input, context, self.config.default_top_k)
            .await
    }

    pub async fn run_with_top_k(
        &self,
        input: &str,
        context: &SessionContext,
        top_k: usize,
    ) -> TurnOutcome {
        let start = Instant::now();
        metrics::counter!("stylist_workflow_runs_total").increment(1);

        let mut state = SessionState::for_turn(input.trim(), context, top_k.max(1));
        let mut scratch = RunScratch::default();
        let mut transitions = Vec::new();
        let mut step = WorkflowStep::Analyze;

        while !step.is_terminal() {
            let outcome = match step {
                WorkflowStep::Analyze => self.analyze(&state, context).await,
                WorkflowStep::Retrieve => self.retrieve(&state, &mut scratch).await,
                WorkflowStep::Evaluate => self.evaluate(&state, &mut scratch),
                WorkflowStep::HandleFeedback => self.handle_feedback(&state, context),
                WorkflowStep::Respond => break,
            };

            debug_assert!(
                step.valid_transitions().contains(&outcome.next),
                "invalid transition {} -> {}",
                step,
                outcome.next
            );
            tracing::debug!(
                from = %step,
                to = %outcome.next,
                reason = ?outcome.reason,
                retry_count = state.retry_count,
                "Workflow transition"
            );

            transitions.push(Transition {
                from: step,
                to: outcome.next,
                reason: outcome.reason,
            });
            state = state.apply(outcome.delta);
            step = outcome.next;
        }

        let state = self.respond(state).await;
        let context = context.after_turn(&state);
        let elapsed = start.elapsed();

        metrics::histogram!("stylist_workflow_seconds").record(elapsed.as_secs_f64());
        tracing::info!(
            intent = state
                .conversation_result
                .as_ref()
                .map(|r| r.intent.as_str())
                .unwrap_or("unknown"),
            recommendations = state.recommendations.len(),
            retry_count = state.retry_count,
            feedback_rounds = state.feedback_rounds,
            error = state.error.is_some(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Workflow run complete"
        );

        TurnOutcome {
            state,
            context,
            transitions,
            elapsed,
        }
    }

    /// Await a provider call, failing it once the timeout passes
    async fn bounded<T, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.provider_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::provider_timeout(
                what,
                self.config.provider_timeout.as_millis() as u64,
            )),
        }
    }

    async fn analyze(&self, state: &SessionState, context: &SessionContext) -> StepOutcome {
        if state.user_input.is_empty() {
            let err = Error::Validation("message must not be empty".to_string());
            return StepOutcome::failed(&err, WorkflowStep::Analyze);
        }

        let analysis = context.analysis_context();
        let result = self
            .bounded(
                "intent extraction",
                self.components.intent.extract(&state.user_input, &analysis),
            )
            .await;

        let result = match result {
            Ok(result) => result,
            Err(e) => return StepOutcome::failed(&e, WorkflowStep::Analyze),
        };

        if result.intent == Intent::Feedback {
            return StepOutcome::to(
                WorkflowStep::HandleFeedback,
                TransitionReason::FeedbackReceived,
                StateDelta {
                    conversation_result: Some(result),
                    ..Default::default()
                },
            );
        }

        if !result.requires_recommendation {
            return StepOutcome::to(
                WorkflowStep::Respond,
                TransitionReason::NoActionNeeded,
                StateDelta {
                    conversation_result: Some(result),
                    ..Default::default()
                },
            );
        }

        let filters = request_filters(&state.filters, &result.extracted_filters);
        if let Err(e) = filters.validate() {
            return StepOutcome::failed(&e, WorkflowStep::Analyze);
        }

        StepOutcome::to(
            WorkflowStep::Retrieve,
            TransitionReason::RecommendationRequested,
            StateDelta {
                conversation_result: Some(result),
                query: Some(state.user_input.clone()),
                filters: Some(filters),
                ..Default::default()
            },
        )
    }

    async fn retrieve(&self, state: &SessionState, scratch: &mut RunScratch) -> StepOutcome {
        let retriever = &self.components.retriever;

        let embedding = match scratch.query_embedding.take() {
            Some(embedding) => embedding,
            None => {
                let query = if state.query.is_empty() {
                    state.user_input.as_str()
                } else {
                    state.query.as_str()
                };
                let embedded = self
                    .bounded("query embedding", async {
                        retriever.embed_query(query).await.map_err(Error::from)
                    })
                    .await;
                match embedded {
                    Ok(embedding) => embedding,
                    Err(e) => return StepOutcome::failed(&e, WorkflowStep::Retrieve),
                }
            },
        };

        let filters = state.effective_filters();
        let ranked = retriever.retrieve_embedding(
            &embedding,
            &filters,
            state.top_k,
            state.overrides.widen_steps,
        );
        scratch.query_embedding = Some(embedding);

        match ranked {
            Ok(recommendations) => {
                metrics::counter!("stylist_retrievals_total").increment(1);
                StepOutcome::to(
                    WorkflowStep::Evaluate,
                    TransitionReason::Retrieved {
                        count: recommendations.len(),
                    },
                    StateDelta {
                        recommendations: Some(recommendations),
                        ..Default::default()
                    },
                )
            },
            Err(e) => StepOutcome::failed(&Error::from(e), WorkflowStep::Retrieve),
        }
    }

    fn evaluate(&self, state: &SessionState, scratch: &mut RunScratch) -> StepOutcome {
        let context = EvaluationContext {
            seen_ids: &state.seen_ids,
            requested_top_k: state.top_k,
        };
        let evaluation = self
            .components
            .evaluator
            .evaluate(&state.recommendations, &context);

        let is_best = scratch
            .best
            .as_ref()
            .map_or(true, |b| evaluation.overall_score > b.evaluation.overall_score);
        if is_best {
            scratch.best = Some(Attempt {
                recommendations: state.recommendations.clone(),
                evaluation: evaluation.clone(),
            });
        }

        if !evaluation.needs_improvement() {
            return StepOutcome::to(
                WorkflowStep::Respond,
                TransitionReason::QualityAccepted(evaluation.quality_level),
                StateDelta {
                    evaluation: Some(evaluation),
                    ..Default::default()
                },
            );
        }

        if state.retry_count < self.config.max_retries {
            metrics::counter!("stylist_workflow_retries_total").increment(1);
            let overrides = adjust_overrides(state, &evaluation.adjustments);
            tracing::debug!(
                score = evaluation.overall_score,
                adjustments = ?evaluation.adjustments,
                widen_steps = overrides.widen_steps,
                relaxed = overrides.relaxed.len(),
                "Retrying retrieval"
            );
            return StepOutcome::to(
                WorkflowStep::Retrieve,
                TransitionReason::QualityRetry {
                    retry_count: state.retry_count + 1,
                },
                StateDelta {
                    evaluation: Some(evaluation),
                    overrides: Some(overrides),
                    bump_retry: true,
                    ..Default::default()
                },
            );
        }

        // budget spent: answer with the best attempt of the run
        let best = scratch.best.take().unwrap_or(Attempt {
            recommendations: state.recommendations.clone(),
            evaluation,
        });
        StepOutcome::to(
            WorkflowStep::Respond,
            TransitionReason::RetryBudgetExhausted,
            StateDelta {
                recommendations: Some(best.recommendations),
                evaluation: Some(best.evaluation),
                ..Default::default()
            },
        )
    }

    fn handle_feedback(&self, state: &SessionState, context: &SessionContext) -> StepOutcome {
        let snapshot = self.components.retriever.index().snapshot();
        let counts = snapshot.match_counts(&state.filters, &self.config.tiers);
        let feedback = self.feedback.interpret_with(
            &state.user_input,
            &state.filters,
            &FeedbackContext {
                match_counts: Some(&counts),
                top_ranked_id: context.top_ranked(),
            },
        );
        let kind = feedback.kind;
        metrics::counter!("stylist_feedback_total", "kind" => kind.as_str()).increment(1);

        if !kind.triggers_retrieval() {
            return StepOutcome::to(
                WorkflowStep::Respond,
                TransitionReason::FeedbackAcknowledged(kind),
                StateDelta {
                    feedback: Some(feedback),
                    ..Default::default()
                },
            );
        }

        let filters = match apply_feedback(&feedback, &state.filters) {
            Ok(filters) => filters,
            Err(e) => return StepOutcome::failed(&e, WorkflowStep::HandleFeedback),
        };

        // re-run the last request's keywords under the new filters
        let query = if state.query.is_empty() {
            state.user_input.clone()
        } else {
            state.query.clone()
        };

        StepOutcome::to(
            WorkflowStep::Retrieve,
            TransitionReason::FeedbackRetrieval(kind),
            StateDelta {
                feedback: Some(feedback),
                filters: Some(filters),
                query: Some(query),
                bump_feedback_round: true,
                ..Default::default()
            },
        )
    }

    async fn respond(&self, state: SessionState) -> SessionState {
        if let Some(ref error) = state.error {
            let text = response::apology(error);
            return state.apply(StateDelta {
                recommendations: Some(Vec::new()),
                final_response: Some(text),
                ..Default::default()
            });
        }

        let generated = self
            .bounded("response generation", self.components.generator.generate(&state))
            .await;
        let lead_in = match generated {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => self.template.lead_in(&state),
            Err(e) => {
                tracing::warn!(error = %e, "Response generation failed, using template");
                metrics::counter!("stylist_errors_total", "step" => "Respond").increment(1);
                self.template.lead_in(&state)
            },
        };

        let text = response::render(&lead_in, &state.recommendations);
        state.apply(StateDelta {
            final_response: Some(text),
            ..Default::default()
        })
    }
}

/// Session filters for a new request. Naming a different category starts
/// the attribute filters over; exclusions always carry forward.
fn request_filters(session: &SearchFilters, extracted: &SearchFilters) -> SearchFilters {
    let switches_category =
        extracted.category.is_some() && extracted.category != session.category;

    let mut filters = if switches_category {
        SearchFilters {
            excluded_ids: session.excluded_ids.clone(),
            ..Default::default()
        }
    } else {
        session.clone()
    };
    filters.overlay(extracted);
    filters
}

/// Run overrides after applying one evaluation's adjustments
fn adjust_overrides(state: &SessionState, adjustments: &[Adjustment]) -> RunOverrides {
    let mut overrides = state.overrides.clone();

    for adjustment in adjustments {
        match adjustment {
            Adjustment::WidenCandidatePool => overrides.widen_steps += 1,
            Adjustment::RelaxSoftFilter => {
                let active: BTreeSet<FilterKey> = state.filters.active_keys().into_iter().collect();
                let next = SOFT_FILTERS
                    .iter()
                    .find(|k| active.contains(*k) && !overrides.relaxed.contains(*k));
                match next {
                    Some(key) => {
                        overrides.relaxed.insert(*key);
                    },
                    // nothing left to relax
                    None => overrides.widen_steps += 1,
                }
            },
            Adjustment::ExcludeShown => {
                overrides
                    .excluded_ids
                    .extend(state.recommendation_ids());
            },
        }
    }
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    use stylist_core::{ConversationResult, EmbeddingProvider, Product};
    use stylist_rag::{IndexHandle, ProductIndex, RetrieverConfig};
    use stylist_text_processing::RuleBasedIntentExtractor;

    use crate::evaluator::QualityEvaluator;

    const DIM: usize = 4;

    /// Same unit vector for every text, so every product is equally similar
    struct FlatEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FlatEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        }

        fn dimension(&self) -> usize {
            DIM
        }

        fn name(&self) -> &str {
            "flat"
        }
    }

    struct SleepingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for SleepingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        }

        fn dimension(&self) -> usize {
            DIM
        }

        fn name(&self) -> &str {
            "sleeping"
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl IntentExtractor for FailingExtractor {
        async fn extract(
            &self,
            _text: &str,
            _context: &stylist_core::AnalysisContext,
        ) -> Result<ConversationResult> {
            Err(Error::Provider("model offline".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ResponseGenerator for FailingGenerator {
        async fn generate(&self, _state: &SessionState) -> Result<String> {
            Err(Error::Provider("model offline".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn verdict(score: f32, level: QualityLevel, adjustments: Vec<Adjustment>) -> EvaluationResult {
        EvaluationResult {
            relevance: score,
            diversity: score,
            novelty: score,
            coverage: score,
            overall_score: score,
            quality_level: level,
            suggestions: Vec::new(),
            adjustments,
        }
    }

    /// Never satisfied
    struct PickyEvaluator;

    impl RecommendationEvaluator for PickyEvaluator {
        fn evaluate(&self, _: &[Recommendation], _: &EvaluationContext<'_>) -> EvaluationResult {
            verdict(0.2, QualityLevel::NeedsImprovement, vec![Adjustment::WidenCandidatePool])
        }

        fn name(&self) -> &str {
            "picky"
        }
    }

    /// Always satisfied
    struct EasyEvaluator;

    impl RecommendationEvaluator for EasyEvaluator {
        fn evaluate(&self, _: &[Recommendation], _: &EvaluationContext<'_>) -> EvaluationResult {
            verdict(0.7, QualityLevel::Good, Vec::new())
        }

        fn name(&self) -> &str {
            "easy"
        }
    }

    /// Replays a fixed sequence of failing scores, asking to exclude shown ids
    struct ScriptedEvaluator(Mutex<VecDeque<f32>>);

    impl RecommendationEvaluator for ScriptedEvaluator {
        fn evaluate(&self, _: &[Recommendation], _: &EvaluationContext<'_>) -> EvaluationResult {
            let score = self.0.lock().pop_front().unwrap_or(0.0);
            verdict(score, QualityLevel::NeedsImprovement, vec![Adjustment::ExcludeShown])
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn product(id: &str, category: &str, style: &str, rating: f32, reviews: u32) -> Product {
        Product::new(id, format!("{} {}", style, id), category)
            .with_styles([style])
            .with_rating(rating, reviews)
            .with_embedding(vec![1.0, 0.0, 0.0, 0.0])
            .with_url(format!("https://shop.example/{}", id))
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("tee-a", "상의", "스트릿", 4.5, 120).with_price(25_000),
            product("tee-b", "상의", "스트릿", 4.2, 80).with_price(45_000),
            product("pants", "하의", "스트릿", 4.8, 300).with_price(39_000),
            product("knit", "상의", "베이직", 4.9, 500).with_price(59_000),
        ]
    }

    fn retriever(
        embedder: Arc<dyn EmbeddingProvider>,
        products: Vec<Product>,
    ) -> Arc<HybridRetriever> {
        let index = ProductIndex::build(products, DIM, 1).unwrap();
        Arc::new(HybridRetriever::new(
            RetrieverConfig::default(),
            embedder,
            Arc::new(IndexHandle::new(index)),
        ))
    }

    fn orchestrator_with(
        embedder: Arc<dyn EmbeddingProvider>,
        evaluator: Arc<dyn RecommendationEvaluator>,
        products: Vec<Product>,
    ) -> Orchestrator {
        Orchestrator::new(
            WorkflowComponents {
                intent: Arc::new(RuleBasedIntentExtractor::new()),
                retriever: retriever(embedder, products),
                evaluator,
                generator: Arc::new(TemplateResponseGenerator::new()),
            },
            WorkflowConfig {
                provider_timeout: Duration::from_millis(200),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn steps(outcome: &TurnOutcome) -> Vec<WorkflowStep> {
        let mut steps = vec![WorkflowStep::Analyze];
        steps.extend(outcome.transitions.iter().map(|t| t.to));
        steps
    }

    #[tokio::test]
    async fn test_recommendation_turn() {
        let orchestrator = orchestrator_with(
            Arc::new(FlatEmbedder),
            Arc::new(QualityEvaluator::default()),
            catalog(),
        );
        let outcome = orchestrator.run("스트릿 반팔", &SessionContext::new()).await;

        assert_eq!(
            steps(&outcome),
            vec![
                WorkflowStep::Analyze,
                WorkflowStep::Retrieve,
                WorkflowStep::Evaluate,
                WorkflowStep::Respond
            ]
        );

        let state = &outcome.state;
        assert_eq!(state.filters.category.as_deref(), Some("상의"));
        assert_eq!(state.filters.style.as_deref(), Some("스트릿"));
        assert_eq!(state.recommendation_ids(), vec!["tee-a", "tee-b"]);
        assert_eq!(state.retry_count, 0);
        assert!(state.error.is_none());
        assert!(outcome.response().contains("1. **스트릿 tee-a**"));

        // committed context remembers what was shown
        assert_eq!(outcome.context.top_ranked(), Some("tee-a"));
        assert!(outcome.context.seen_ids.contains("tee-b"));
        assert_eq!(outcome.context.last_query.as_deref(), Some("스트릿 반팔"));
    }

    #[tokio::test]
    async fn test_retry_budget_bounds_the_loop() {
        let orchestrator =
            orchestrator_with(Arc::new(FlatEmbedder), Arc::new(PickyEvaluator), catalog());
        let outcome = orchestrator.run("스트릿 반팔 추천해줘", &SessionContext::new()).await;

        let max_retries = orchestrator.config().max_retries;
        assert_eq!(outcome.state.retry_count, max_retries);
        assert_eq!(outcome.retrievals(), max_retries as usize + 1);
        assert_eq!(
            outcome.transitions.last().map(|t| &t.reason),
            Some(&TransitionReason::RetryBudgetExhausted)
        );
        // still answers with results, never an error
        assert!(outcome.state.error.is_none());
        assert_eq!(outcome.state.recommendations.len(), 2);
        assert_eq!(outcome.state.overrides.widen_steps, max_retries);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_keeps_best_attempt() {
        let products: Vec<Product> = (1..=6)
            .map(|i| product(&format!("p{}", i), "상의", "베이직", 4.0, 10 * (7 - i)))
            .collect();
        let evaluator = ScriptedEvaluator(Mutex::new(VecDeque::from(vec![0.5, 0.3, 0.4])));
        let orchestrator = orchestrator_with(Arc::new(FlatEmbedder), Arc::new(evaluator), products);

        let outcome = orchestrator
            .run_with_top_k("베이직 상의 보여줘", &SessionContext::new(), 2)
            .await;

        assert_eq!(outcome.retrievals(), 3);
        assert_eq!(outcome.state.recommendation_ids(), vec!["p1", "p2"]);
        let evaluation = outcome.state.evaluation.as_ref().unwrap();
        assert!((evaluation.overall_score - 0.5).abs() < 1e-6);
        // exclusions were run-local
        assert!(outcome.context.filters.excluded_ids.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedding_timeout_falls_back_to_apology() {
        let orchestrator = orchestrator_with(
            Arc::new(SleepingEmbedder),
            Arc::new(QualityEvaluator::default()),
            catalog(),
        );
        let outcome = orchestrator.run("스트릿 반팔 추천해줘", &SessionContext::new()).await;

        assert_eq!(outcome.response(), workflow::FALLBACK_APOLOGY);
        assert!(outcome.state.recommendations.is_empty());
        let error = outcome.state.error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Provider);
        assert_eq!(error.step, WorkflowStep::Retrieve);
        assert_eq!(
            steps(&outcome),
            vec![
                WorkflowStep::Analyze,
                WorkflowStep::Retrieve,
                WorkflowStep::Respond
            ]
        );
        // a failed run does not advance what the session has seen
        assert!(outcome.context.seen_ids.is_empty());
    }

    #[tokio::test]
    async fn test_cheaper_feedback_reruns_retrieval() {
        let orchestrator =
            orchestrator_with(Arc::new(FlatEmbedder), Arc::new(EasyEvaluator), catalog());

        let first = orchestrator.run("스트릿 반팔", &SessionContext::new()).await;
        assert_eq!(first.state.recommendations.len(), 2);

        let second = orchestrator.run("더 저렴한 거", &first.context).await;
        assert_eq!(
            steps(&second),
            vec![
                WorkflowStep::Analyze,
                WorkflowStep::HandleFeedback,
                WorkflowStep::Retrieve,
                WorkflowStep::Evaluate,
                WorkflowStep::Respond
            ]
        );

        let state = &second.state;
        assert_eq!(state.filters.max_price, Some(30_000));
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.feedback_rounds, 1);
        assert_eq!(state.recommendation_ids(), vec!["tee-a"]);
        assert!(second.response().starts_with("💰"));

        // the new ceiling persists into the session
        assert_eq!(second.context.filters.max_price, Some(30_000));
        assert_eq!(second.context.feedback_history.len(), 1);
    }

    #[tokio::test]
    async fn test_negative_feedback_excludes_top_product() {
        let orchestrator =
            orchestrator_with(Arc::new(FlatEmbedder), Arc::new(EasyEvaluator), catalog());
        let first = orchestrator.run("스트릿 반팔", &SessionContext::new()).await;
        let second = orchestrator.run("별로야", &first.context).await;

        assert_eq!(
            second.transitions[1].reason,
            TransitionReason::FeedbackRetrieval(FeedbackKind::Negative)
        );
        // category and style each match three products; style goes first
        assert!(second.state.filters.style.is_none());
        assert_eq!(second.state.filters.category.as_deref(), Some("상의"));
        assert!(second.state.filters.excluded_ids.contains("tee-a"));
        assert!(!second.state.recommendation_ids().contains(&"tee-a".to_string()));
    }

    #[tokio::test]
    async fn test_positive_feedback_ends_without_retrieval() {
        let orchestrator =
            orchestrator_with(Arc::new(FlatEmbedder), Arc::new(EasyEvaluator), catalog());
        let first = orchestrator.run("스트릿 반팔", &SessionContext::new()).await;
        let second = orchestrator.run("좋아요 고마워", &first.context).await;

        assert_eq!(second.retrievals(), 0);
        assert_eq!(
            second.transitions.last().map(|t| t.to),
            Some(WorkflowStep::Respond)
        );
        assert_eq!(second.context.feedback_history.len(), 1);
        assert_eq!(second.context.last_recommendations, first.context.last_recommendations);
    }

    #[tokio::test]
    async fn test_chitchat_skips_retrieval() {
        let orchestrator = orchestrator_with(
            Arc::new(FlatEmbedder),
            Arc::new(QualityEvaluator::default()),
            catalog(),
        );
        let outcome = orchestrator.run("안녕하세요", &SessionContext::new()).await;

        assert_eq!(steps(&outcome), vec![WorkflowStep::Analyze, WorkflowStep::Respond]);
        assert_eq!(outcome.transitions[0].reason, TransitionReason::NoActionNeeded);
        assert!(outcome.response().contains("패션에 대해 궁금한 점"));
        assert_eq!(outcome.context.turn_count, 1);
    }

    #[tokio::test]
    async fn test_component_failures_are_isolated() {
        let failing_intent = Orchestrator::new(
            WorkflowComponents {
                intent: Arc::new(FailingExtractor),
                retriever: retriever(Arc::new(FlatEmbedder), catalog()),
                evaluator: Arc::new(QualityEvaluator::default()),
                generator: Arc::new(TemplateResponseGenerator::new()),
            },
            WorkflowConfig::default(),
        )
        .unwrap();
        let outcome = failing_intent.run("스트릿 반팔", &SessionContext::new()).await;
        assert_eq!(outcome.response(), workflow::FALLBACK_APOLOGY);
        assert_eq!(outcome.state.error.as_ref().unwrap().step, WorkflowStep::Analyze);

        let failing_generator = Orchestrator::new(
            WorkflowComponents {
                intent: Arc::new(RuleBasedIntentExtractor::new()),
                retriever: retriever(Arc::new(FlatEmbedder), catalog()),
                evaluator: Arc::new(EasyEvaluator),
                generator: Arc::new(FailingGenerator),
            },
            WorkflowConfig::default(),
        )
        .unwrap();
        let outcome = failing_generator.run("스트릿 반팔", &SessionContext::new()).await;
        assert!(outcome.state.error.is_none());
        assert!(outcome.response().contains("스트릿 tee-a"));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let orchestrator =
            orchestrator_with(Arc::new(FlatEmbedder), Arc::new(EasyEvaluator), catalog());
        let outcome = orchestrator.run("   ", &SessionContext::new()).await;
        assert_eq!(
            outcome.state.error.as_ref().map(|e| e.kind),
            Some(ErrorKind::Validation)
        );
        assert_eq!(outcome.response(), workflow::FALLBACK_APOLOGY);
    }

    #[test]
    fn test_request_filters() {
        let session = SearchFilters::new().category("상의").style("스트릿").exclude("x");

        let same = request_filters(&session, &SearchFilters::new().color("블랙"));
        assert_eq!(same.style.as_deref(), Some("스트릿"));
        assert_eq!(same.color.as_deref(), Some("블랙"));

        let switched = request_filters(&session, &SearchFilters::new().category("신발"));
        assert_eq!(switched.category.as_deref(), Some("신발"));
        assert!(switched.style.is_none());
        assert!(switched.excluded_ids.contains("x"));
    }

    #[test]
    fn test_adjust_overrides() {
        let state = SessionState {
            filters: SearchFilters::new().category("상의").style("스트릿").color("블랙"),
            ..Default::default()
        };

        let once = adjust_overrides(&state, &[Adjustment::RelaxSoftFilter]);
        assert!(once.relaxed.contains(&FilterKey::Color));

        let state = SessionState {
            overrides: once,
            ..state
        };
        let twice = adjust_overrides(
            &state,
            &[Adjustment::RelaxSoftFilter, Adjustment::WidenCandidatePool],
        );
        assert!(twice.relaxed.contains(&FilterKey::Style));
        assert!(!twice.relaxed.contains(&FilterKey::Category));
        assert_eq!(twice.widen_steps, 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Orchestrator::new(
            WorkflowComponents {
                intent: Arc::new(RuleBasedIntentExtractor::new()),
                retriever: retriever(Arc::new(FlatEmbedder), Vec::new()),
                evaluator: Arc::new(EasyEvaluator),
                generator: Arc::new(TemplateResponseGenerator::new()),
            },
            WorkflowConfig {
                provider_timeout: Duration::ZERO,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AgentError::Configuration(_))));
    }
}
