//! Per-turn workflow state and per-session accumulated context
//!
//! [`SessionState`] is owned by one workflow run. Steps never mutate it in
//! place: each produces a [`StateDelta`] that [`SessionState::apply`] folds
//! into a new value. [`SessionContext`] survives across turns and is only
//! replaced after a run reaches `Respond`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::conversation::{AnalysisContext, ConversationResult};
use crate::error::ErrorInfo;
use crate::feedback::{Feedback, FeedbackKind, FeedbackRecord};
use crate::filters::{FilterKey, SearchFilters};
use crate::recommendation::{EvaluationResult, Recommendation};

/// Workflow state machine steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Analyze,
    Retrieve,
    Evaluate,
    HandleFeedback,
    Respond,
}

impl WorkflowStep {
    pub fn display_name(&self) -> &'static str {
        match self {
            WorkflowStep::Analyze => "Analyze",
            WorkflowStep::Retrieve => "Retrieve",
            WorkflowStep::Evaluate => "Evaluate",
            WorkflowStep::HandleFeedback => "HandleFeedback",
            WorkflowStep::Respond => "Respond",
        }
    }

    /// Steps reachable from this one
    pub fn valid_transitions(&self) -> &'static [WorkflowStep] {
        match self {
            WorkflowStep::Analyze => &[
                WorkflowStep::Retrieve,
                WorkflowStep::HandleFeedback,
                WorkflowStep::Respond,
            ],
            WorkflowStep::Retrieve => &[WorkflowStep::Evaluate, WorkflowStep::Respond],
            WorkflowStep::Evaluate => &[WorkflowStep::Retrieve, WorkflowStep::Respond],
            WorkflowStep::HandleFeedback => &[WorkflowStep::Retrieve, WorkflowStep::Respond],
            WorkflowStep::Respond => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStep::Respond)
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Relaxations that only apply to the current run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOverrides {
    /// Filters dropped for this run
    pub relaxed: BTreeSet<FilterKey>,
    /// Extra exclusions for this run
    pub excluded_ids: BTreeSet<String>,
    /// How many times the candidate pool was widened
    pub widen_steps: u32,
}

/// State threaded through one workflow run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub user_input: String,
    pub conversation_result: Option<ConversationResult>,
    pub recommendations: Vec<Recommendation>,
    pub evaluation: Option<EvaluationResult>,
    pub feedback: Option<Feedback>,
    pub final_response: Option<String>,
    pub error: Option<ErrorInfo>,
    /// Quality-driven retries taken in this run
    pub retry_count: u32,
    /// Feedback-driven re-retrievals, counted apart from `retry_count`
    pub feedback_rounds: u32,
    /// Retrieval query text
    pub query: String,
    /// Filters the session asked for
    pub filters: SearchFilters,
    pub overrides: RunOverrides,
    pub top_k: usize,
    /// Products shown in earlier turns, for novelty
    pub seen_ids: BTreeSet<String>,
}

/// Changes produced by one workflow step
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub conversation_result: Option<ConversationResult>,
    pub recommendations: Option<Vec<Recommendation>>,
    pub evaluation: Option<EvaluationResult>,
    pub feedback: Option<Feedback>,
    pub final_response: Option<String>,
    pub error: Option<ErrorInfo>,
    pub query: Option<String>,
    pub filters: Option<SearchFilters>,
    pub overrides: Option<RunOverrides>,
    pub bump_retry: bool,
    pub bump_feedback_round: bool,
}

impl StateDelta {
    pub fn error(info: ErrorInfo) -> Self {
        Self {
            error: Some(info),
            ..Default::default()
        }
    }
}

impl SessionState {
    /// Fresh state for a new turn, seeded from the session
    pub fn for_turn(user_input: impl Into<String>, context: &SessionContext, top_k: usize) -> Self {
        Self {
            user_input: user_input.into(),
            query: context.last_query.clone().unwrap_or_default(),
            filters: context.filters.clone(),
            top_k,
            seen_ids: context.seen_ids.clone(),
            ..Default::default()
        }
    }

    /// Fold a delta into a new state value
    pub fn apply(self, delta: StateDelta) -> Self {
        Self {
            conversation_result: delta.conversation_result.or(self.conversation_result),
            recommendations: delta.recommendations.unwrap_or(self.recommendations),
            evaluation: delta.evaluation.or(self.evaluation),
            feedback: delta.feedback.or(self.feedback),
            final_response: delta.final_response.or(self.final_response),
            error: delta.error.or(self.error),
            retry_count: self.retry_count + u32::from(delta.bump_retry),
            feedback_rounds: self.feedback_rounds + u32::from(delta.bump_feedback_round),
            query: delta.query.unwrap_or(self.query),
            filters: delta.filters.unwrap_or(self.filters),
            overrides: delta.overrides.unwrap_or(self.overrides),
            user_input: self.user_input,
            top_k: self.top_k,
            seen_ids: self.seen_ids,
        }
    }

    /// Session filters with the run's relaxations applied
    pub fn effective_filters(&self) -> SearchFilters {
        let mut filters = self.filters.clone();
        for key in &self.overrides.relaxed {
            filters.remove(*key);
        }
        filters
            .excluded_ids
            .extend(self.overrides.excluded_ids.iter().cloned());
        filters
    }

    pub fn recommendation_ids(&self) -> Vec<String> {
        self.recommendations
            .iter()
            .map(|r| r.product.id.clone())
            .collect()
    }
}

/// State accumulated across the turns of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub filters: SearchFilters,
    pub seen_ids: BTreeSet<String>,
    pub last_query: Option<String>,
    /// Ids of the most recent recommendations, best first
    pub last_recommendations: Vec<String>,
    pub feedback_history: Vec<FeedbackRecord>,
    /// Mention counts per attribute value
    pub preferences: BTreeMap<FilterKey, BTreeMap<String, u32>>,
    pub turn_count: u32,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analysis_context(&self) -> AnalysisContext {
        AnalysisContext {
            has_recommendations: !self.last_recommendations.is_empty(),
            active_filters: self.filters.clone(),
            last_query: self.last_query.clone(),
        }
    }

    pub fn top_ranked(&self) -> Option<&str> {
        self.last_recommendations.first().map(String::as_str)
    }

    /// Context after a run that reached `Respond`
    pub fn after_turn(&self, state: &SessionState) -> Self {
        let mut next = self.clone();
        next.turn_count += 1;

        if let Some(ref feedback) = state.feedback {
            next.record_feedback(feedback);
        }

        if state.error.is_some() {
            return next;
        }

        if let Some(ref result) = state.conversation_result {
            next.count_preferences(&result.extracted_filters);
        }
        if !state.query.is_empty() {
            next.last_query = Some(state.query.clone());
        }
        next.filters = state.filters.clone();

        if !state.recommendations.is_empty() {
            let ids = state.recommendation_ids();
            next.seen_ids.extend(ids.iter().cloned());
            next.last_recommendations = ids;
        }
        next
    }

    /// Record feedback; behavioral signals also mark the product as seen
    pub fn record_feedback(&mut self, feedback: &Feedback) {
        if feedback.kind == FeedbackKind::Behavioral {
            if let Some(ref id) = feedback.product_id {
                self.seen_ids.insert(id.clone());
            }
        }
        self.feedback_history.push(FeedbackRecord::from(feedback));
    }

    fn count_preferences(&mut self, filters: &SearchFilters) {
        let mentions = [
            (FilterKey::Category, filters.category.clone()),
            (FilterKey::Style, filters.style.clone()),
            (FilterKey::Color, filters.color.clone()),
            (
                FilterKey::PriceRange,
                filters.price_range.map(|t| t.label().to_string()),
            ),
        ];
        for (key, value) in mentions {
            if let Some(value) = value {
                *self
                    .preferences
                    .entry(key)
                    .or_default()
                    .entry(value)
                    .or_insert(0) += 1;
            }
        }
    }

    /// Clear filters, history and exclusions
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
