//! LLM-backed response lead-ins

use async_trait::async_trait;
use std::sync::Arc;

use stylist_core::{ResponseGenerator, Result, SessionState};
use stylist_text_processing::TemplateResponseGenerator;

use crate::backend::LlmBackend;
use crate::prompt::PromptBuilder;

/// [`ResponseGenerator`] over an [`LlmBackend`], falling back to templates
pub struct LlmResponseGenerator {
    backend: Arc<dyn LlmBackend>,
    fallback: TemplateResponseGenerator,
}

impl LlmResponseGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            fallback: TemplateResponseGenerator::new(),
        }
    }
}

#[async_trait]
impl ResponseGenerator for LlmResponseGenerator {
    async fn generate(&self, state: &SessionState) -> Result<String> {
        let messages = PromptBuilder::new().response(state).build();

        match self.backend.generate(&messages).await {
            Ok(result) if !result.text.trim().is_empty() => Ok(result.text.trim().to_string()),
            Ok(_) => {
                tracing::warn!("LLM returned an empty response, using template");
                Ok(self.fallback.lead_in(state))
            },
            Err(e) => {
                tracing::warn!(error = %e, "LLM response generation failed, using template");
                Ok(self.fallback.lead_in(state))
            },
        }
    }

    fn name(&self) -> &str {
        "llm"
    }
}
