//! LLM-backed intent extraction
//!
//! Asks the model for a JSON verdict and canonicalizes every attribute
//! through the lexicon. Any failure falls back to the rule-based extractor.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use stylist_core::{
    AnalysisContext, ConversationResult, Intent, IntentExtractor, PriceTier, Result, SearchFilters,
};
use stylist_text_processing::{Lexicon, RuleBasedIntentExtractor};

use crate::backend::LlmBackend;
use crate::prompt::PromptBuilder;
use crate::LlmError;

#[derive(Debug, Deserialize)]
struct IntentPayload {
    intent: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    extracted_info: ExtractedInfo,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractedInfo {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    price_range: Option<String>,
    #[serde(default)]
    max_price: Option<u32>,
}

/// [`IntentExtractor`] over an [`LlmBackend`]
pub struct LlmIntentExtractor {
    backend: Arc<dyn LlmBackend>,
    fallback: RuleBasedIntentExtractor,
}

impl LlmIntentExtractor {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            fallback: RuleBasedIntentExtractor::new(),
        }
    }

    fn lexicon(&self) -> &Lexicon {
        self.fallback.lexicon()
    }

    async fn ask(
        &self,
        text: &str,
        context: &AnalysisContext,
    ) -> std::result::Result<ConversationResult, LlmError> {
        let messages = PromptBuilder::new().intent(text, context).build();
        let generation = self.backend.generate(&messages).await?;
        self.parse(&generation.text, text, context)
    }

    /// Turn model output into a result; the JSON may be wrapped in prose or fences
    fn parse(
        &self,
        output: &str,
        text: &str,
        context: &AnalysisContext,
    ) -> std::result::Result<ConversationResult, LlmError> {
        let json = extract_json_object(output)
            .ok_or_else(|| LlmError::InvalidResponse("no JSON object in output".to_string()))?;
        let payload: IntentPayload = serde_json::from_str(json)
            .map_err(|e| LlmError::InvalidResponse(format!("intent JSON: {}", e)))?;

        let intent = Intent::parse(&payload.intent).ok_or_else(|| {
            LlmError::InvalidResponse(format!("unknown intent: {}", payload.intent))
        })?;

        let filters = self.canonical_filters(&payload.extracted_info, text);

        let intent = match intent {
            // feedback needs something to react to
            Intent::Feedback if !context.has_recommendations => {
                if filters.is_empty() {
                    Intent::Chitchat
                } else {
                    Intent::RecommendationRequest
                }
            },
            other => other,
        };

        let confidence = payload.confidence.unwrap_or(0.9);
        Ok(ConversationResult::new(intent, filters).with_confidence(confidence))
    }

    fn canonical_filters(&self, info: &ExtractedInfo, text: &str) -> SearchFilters {
        let lexicon = self.lexicon();
        let mut filters = SearchFilters::new();

        filters.category = info
            .category
            .as_deref()
            .and_then(|v| lexicon.match_category(v))
            .map(str::to_string);
        filters.style = info
            .style
            .as_deref()
            .and_then(|v| lexicon.match_style(v))
            .map(str::to_string);
        filters.color = info
            .color
            .as_deref()
            .and_then(|v| lexicon.match_color(v))
            .map(str::to_string);

        // an explicit ceiling in the text beats whatever the model guessed
        filters.max_price = lexicon
            .match_price_ceiling(text)
            .or(info.max_price)
            .filter(|p| *p > 0);
        if filters.max_price.is_none() {
            filters.price_range = info.price_range.as_deref().and_then(PriceTier::parse);
        }

        filters
    }
}

#[async_trait]
impl IntentExtractor for LlmIntentExtractor {
    async fn extract(&self, text: &str, context: &AnalysisContext) -> Result<ConversationResult> {
        match self.ask(text, context).await {
            Ok(result) => {
                tracing::debug!(
                    intent = %result.intent,
                    confidence = result.confidence,
                    model = %self.backend.model_name(),
                    "LLM intent classified"
                );
                Ok(result)
            },
            Err(e) => {
                tracing::warn!(error = %e, "LLM intent extraction failed, using rules");
                Ok(self.fallback.classify(text, context))
            },
        }
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Outermost `{...}` span of `text`
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
