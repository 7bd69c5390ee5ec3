//! Rule-based intent detection
//!
//! Classifies a turn as a recommendation request, feedback on the previous
//! recommendations, or chitchat, and extracts the attributes it mentions.
//!
//! # Example
//!
//! ```
//! use stylist_core::{AnalysisContext, Intent};
//! use stylist_text_processing::intent::RuleBasedIntentExtractor;
//!
//! let extractor = RuleBasedIntentExtractor::new();
//! let result = extractor.classify("스트릿 반팔 추천해줘", &AnalysisContext::default());
//!
//! assert_eq!(result.intent, Intent::RecommendationRequest);
//! assert_eq!(result.extracted_filters.style.as_deref(), Some("스트릿"));
//! ```

use async_trait::async_trait;

use stylist_core::{AnalysisContext, ConversationResult, Intent, IntentExtractor, Result};

use crate::cues;
use crate::lexicon::{normalize, Lexicon};

/// Keyword-driven [`IntentExtractor`]
#[derive(Debug, Clone, Default)]
pub struct RuleBasedIntentExtractor {
    lexicon: Lexicon,
}

impl RuleBasedIntentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lexicon(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Classify one utterance
    ///
    /// Feedback requires earlier recommendations in the session; without
    /// them a "cheaper" or "trendier" cue is just a request attribute. An
    /// explicit request naming a different category starts a new search
    /// even when it also carries a feedback cue.
    pub fn classify(&self, text: &str, context: &AnalysisContext) -> ConversationResult {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return ConversationResult::chitchat().with_confidence(0.5);
        }

        let filters = self.lexicon.extract_filters(&normalized);
        let asks = cues::asks_for_recommendation(&normalized);
        let feedback_kind = cues::detect_feedback_kind(&normalized);

        let switches_category = asks
            && filters.category.is_some()
            && filters.category != context.active_filters.category;

        let (intent, confidence) = if context.has_recommendations
            && feedback_kind.is_some()
            && !switches_category
        {
            (Intent::Feedback, 0.7)
        } else if asks || !filters.is_empty() {
            (Intent::RecommendationRequest, 0.8)
        } else {
            (Intent::Chitchat, 0.5)
        };

        tracing::debug!(
            intent = %intent,
            confidence,
            attributes = filters.active_keys().len(),
            "Rule-based intent classified"
        );

        ConversationResult::new(intent, filters).with_confidence(confidence)
    }
}

#[async_trait]
impl IntentExtractor for RuleBasedIntentExtractor {
    async fn extract(&self, text: &str, context: &AnalysisContext) -> Result<ConversationResult> {
        Ok(self.classify(text, context))
    }

    fn name(&self) -> &str {
        "rule_based"
    }
}
