//! Conversation analysis result

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filters::SearchFilters;

/// User intent for one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    RecommendationRequest,
    Feedback,
    Chitchat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::RecommendationRequest => "recommendation_request",
            Intent::Feedback => "feedback",
            Intent::Chitchat => "chitchat",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "recommendation_request" | "recommendation" => Some(Intent::RecommendationRequest),
            "feedback" => Some(Intent::Feedback),
            "chitchat" | "general_conversation" | "information_request" => Some(Intent::Chitchat),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of intent/entity extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub intent: Intent,
    /// Attributes mentioned in this turn
    pub extracted_filters: SearchFilters,
    pub requires_recommendation: bool,
    #[serde(default)]
    pub confidence: f32,
}

impl ConversationResult {
    pub fn new(intent: Intent, extracted_filters: SearchFilters) -> Self {
        Self {
            intent,
            requires_recommendation: intent == Intent::RecommendationRequest,
            extracted_filters,
            confidence: 1.0,
        }
    }

    pub fn chitchat() -> Self {
        Self::new(Intent::Chitchat, SearchFilters::default())
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// What the extractor knows about the session when analyzing a turn
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    /// The session has already been shown recommendations
    pub has_recommendations: bool,
    pub active_filters: SearchFilters,
    pub last_query: Option<String>,
}
