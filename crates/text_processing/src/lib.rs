//! Korean fashion text processing
//!
//! This crate provides the rule-based language layer:
//! - **Lexicon**: category, style, color and price keyword tables
//! - **Cues**: recommendation and feedback cue words
//! - **Intent Detection**: [`RuleBasedIntentExtractor`]
//! - **Templates**: [`TemplateResponseGenerator`] response lead-ins
//! - **Tokenization**: Unicode word splitting for embeddings

pub mod cues;
pub mod intent;
pub mod lexicon;
pub mod response;
pub mod tokenize;

pub use intent::RuleBasedIntentExtractor;
pub use lexicon::{Lexicon, LexiconEntry};
pub use response::TemplateResponseGenerator;
