//! Prompt building
//!
//! Prompts for the fashion assistant. Intent extraction asks for a JSON
//! object; response generation asks for a short lead-in only, since the
//! product list is rendered by the workflow.

use serde::{Deserialize, Serialize};
use std::fmt;

use stylist_core::{AnalysisContext, SearchFilters, SessionState};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

pub const ASSISTANT_PERSONA: &str = "당신은 친근하고 도움이 되는 패션 추천 어시스턴트입니다.

대화 스타일:
- 친근하고 자연스러운 톤을 사용하세요
- 이모티콘을 적절히 활용하세요 (예: 😊, 👕, 💡)
- 사용자의 감정과 의도에 공감하며 반응하세요
- 추천 이유를 명확하고 이해하기 쉽게 설명하세요";

pub const INTENT_ANALYST: &str = "당신은 사용자 의도를 정확히 분석하는 AI입니다. JSON 객체 하나만 출력하세요.";

/// Builder for chat prompts
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Messages for intent and attribute extraction
    pub fn intent(self, text: &str, context: &AnalysisContext) -> Self {
        let session = if context.has_recommendations {
            format!(
                "이 사용자는 이미 추천을 받았습니다. 현재 조건: {}",
                describe_filters(&context.active_filters)
            )
        } else {
            "이 사용자는 아직 추천을 받지 않았습니다.".to_string()
        };

        let prompt = format!(
            r#"다음 사용자 입력의 의도를 분석해주세요:

사용자 입력: "{text}"
{session}

다음 JSON 형식으로 응답해주세요:
{{
    "intent": "recommendation_request|feedback|chitchat",
    "confidence": 0.0-1.0,
    "extracted_info": {{
        "category": "상의|하의|신발|아우터|패션소품",
        "style": "오버핏|슬림핏|베이직|스트릿|빈티지|꾸안꾸|트렌디",
        "color": "블랙|화이트|네이비|그레이|베이지|레드|블루",
        "price_range": "저렴|보통|고급",
        "max_price": 30000
    }}
}}
언급되지 않은 항목은 null로 두세요. 이전 추천에 대한 반응("더 저렴한 거", "별로야")은 feedback입니다."#
        );

        self.system(INTENT_ANALYST).user(prompt)
    }

    /// Messages for the response lead-in of a finished run
    pub fn response(self, state: &SessionState) -> Self {
        let intent = state
            .conversation_result
            .as_ref()
            .map(|r| r.intent.as_str())
            .unwrap_or("chitchat");

        let products = if state.recommendations.is_empty() {
            "없음".to_string()
        } else {
            state
                .recommendations
                .iter()
                .map(|r| format!("- {} ({})", r.product.name, r.product.category))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let feedback = state
            .feedback
            .as_ref()
            .map(|f| f.kind.as_str())
            .unwrap_or("없음");

        let prompt = format!(
            r#"현재 사용자 입력: "{input}"

의도: {intent}
피드백 유형: {feedback}
적용된 조건: {filters}
추천 상품:
{products}

위 상황에 맞는 짧은 안내 문장을 한두 문장으로 작성해주세요. 상품 목록은 따로 보여드리니 다시 나열하지 마세요. 추천 상품이 없으면 조건을 바꿔보도록 안내해주세요."#,
            input = state.user_input,
            filters = describe_filters(&state.filters),
        );

        self.system(ASSISTANT_PERSONA).user(prompt)
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}

/// Human-readable summary of active filters
pub fn describe_filters(filters: &SearchFilters) -> String {
    let mut parts = Vec::new();
    if let Some(ref category) = filters.category {
        parts.push(format!("카테고리 {}", category));
    }
    if let Some(ref style) = filters.style {
        parts.push(format!("스타일 {}", style));
    }
    if let Some(ref color) = filters.color {
        parts.push(format!("색상 {}", color));
    }
    if let Some(tier) = filters.price_range {
        parts.push(format!("가격대 {}", tier.label()));
    }
    if let Some(max_price) = filters.max_price {
        parts.push(format!("{}원 이하", max_price));
    }
    if let Some(min_rating) = filters.min_rating {
        parts.push(format!("평점 {:.1} 이상", min_rating));
    }

    if parts.is_empty() {
        "없음".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylist_core::PriceTier;

    #[test]
    fn test_intent_prompt_mentions_session() {
        let context = AnalysisContext {
            has_recommendations: true,
            active_filters: SearchFilters::new().category("상의"),
            last_query: None,
        };
        let messages = PromptBuilder::new().intent("더 저렴한 거", &context).build();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.contains("더 저렴한 거"));
        assert!(messages[1].content.contains("카테고리 상의"));
    }

    #[test]
    fn test_describe_filters() {
        assert_eq!(describe_filters(&SearchFilters::new()), "없음");
        let filters = SearchFilters::new()
            .style("스트릿")
            .price_range(PriceTier::Budget)
            .min_rating(4.5);
        assert_eq!(describe_filters(&filters), "스타일 스트릿, 가격대 저렴, 평점 4.5 이상");
    }
}
