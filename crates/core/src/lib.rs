//! Core traits and types for the fashion recommendation engine
//!
//! This crate provides foundational types used across all other crates:
//! - Catalog products and metadata filters
//! - Per-turn workflow state and per-session context
//! - Recommendations, evaluations and feedback
//! - Traits for the external embedding and language capabilities
//! - Error types

pub mod conversation;
pub mod error;
pub mod feedback;
pub mod filters;
pub mod product;
pub mod providers;
pub mod recommendation;
pub mod session;

pub use conversation::{AnalysisContext, ConversationResult, Intent};
pub use error::{Error, ErrorInfo, ErrorKind, Result};
pub use feedback::{BehaviorSignal, Feedback, FeedbackKind, FeedbackRecord, Refinement};
pub use filters::{FilterDelta, FilterKey, PriceTier, PriceTiers, SearchFilters};
pub use product::Product;
pub use providers::{EmbeddingProvider, IntentExtractor, ResponseGenerator};
pub use recommendation::{Adjustment, EvaluationResult, QualityLevel, Recommendation};
pub use session::{RunOverrides, SessionContext, SessionState, StateDelta, WorkflowStep};
