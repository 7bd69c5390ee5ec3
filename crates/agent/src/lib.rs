//! Recommendation workflow
//!
//! Features:
//! - Quality evaluation on relevance, diversity, novelty and coverage
//! - Feedback interpretation into filter deltas
//! - Response rendering with an apology fallback
//! - The turn orchestrator: Analyze, Retrieve, Evaluate, HandleFeedback, Respond

pub mod evaluator;
pub mod feedback;
pub mod orchestrator;
pub mod response;

pub use evaluator::{
    EvaluationContext, EvaluationRecord, EvaluationSummary, QualityEvaluator, QualityWeights,
    RecommendationEvaluator,
};
pub use feedback::{apply_feedback, FeedbackContext, FeedbackInterpreter};
pub use orchestrator::{
    Orchestrator, Transition, TransitionReason, TurnOutcome, WorkflowComponents, WorkflowConfig,
};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Feedback error: {0}")]
    Feedback(String),
}

impl From<AgentError> for stylist_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Configuration(msg) => stylist_core::Error::Config(msg),
            AgentError::Feedback(msg) => stylist_core::Error::Validation(msg),
        }
    }
}
