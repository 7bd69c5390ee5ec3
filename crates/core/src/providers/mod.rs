//! External capability traits
//!
//! The workflow consumes three black-box capabilities. Each is an async
//! trait object so deployments can swap a model-backed implementation for a
//! rule-based one, and tests can substitute mocks.

mod embedding;
mod language;

pub use embedding::EmbeddingProvider;
pub use language::{IntentExtractor, ResponseGenerator};
