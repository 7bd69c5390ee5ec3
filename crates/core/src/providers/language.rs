use async_trait::async_trait;

use crate::conversation::{AnalysisContext, ConversationResult};
use crate::error::Result;
use crate::session::SessionState;

/// Natural-language intent and entity extraction
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, text: &str, context: &AnalysisContext) -> Result<ConversationResult>;

    fn name(&self) -> &str;
}

/// Natural-language response generation
///
/// Produces the conversational lead-in for a turn. The recommendation list
/// itself is rendered by the workflow.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, state: &SessionState) -> Result<String>;

    fn name(&self) -> &str;
}
