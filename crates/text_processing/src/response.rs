//! Template response lead-ins
//!
//! Used when no language model is configured, and as the fallback when the
//! model fails. The recommendation list itself is appended by the workflow.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use stylist_core::{
    FeedbackKind, Intent, Refinement, ResponseGenerator, Result, SearchFilters, SessionState,
};

const GREETINGS: &[&str] = &["안녕하세요!", "반가워요!", "안녕하세요 😊"];
const CHITCHAT_SUFFIX: &str = " 패션에 대해 궁금한 점이 있으시면 언제든 말씀해주세요!";

pub const NO_RESULTS: &str =
    "😥 조건에 맞는 상품을 찾지 못했어요. 조건을 조금 바꿔서 다시 말씀해주세요.";

#[derive(Debug, Clone, Default)]
pub struct TemplateResponseGenerator;

impl TemplateResponseGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Lead-in text for a finished run
    pub fn lead_in(&self, state: &SessionState) -> String {
        if let Some(ref feedback) = state.feedback {
            if feedback.kind.triggers_retrieval() && state.recommendations.is_empty() {
                return NO_RESULTS.to_string();
            }
            return feedback_lead_in(feedback.kind, feedback.refinement);
        }

        let intent = state.conversation_result.as_ref().map(|r| r.intent);
        match intent {
            Some(Intent::RecommendationRequest) if state.recommendations.is_empty() => {
                NO_RESULTS.to_string()
            },
            Some(Intent::RecommendationRequest) => recommendation_lead_in(&state.filters),
            _ => greeting(),
        }
    }
}

#[async_trait]
impl ResponseGenerator for TemplateResponseGenerator {
    async fn generate(&self, state: &SessionState) -> Result<String> {
        Ok(self.lead_in(state))
    }

    fn name(&self) -> &str {
        "template"
    }
}

fn recommendation_lead_in(filters: &SearchFilters) -> String {
    let color = filters
        .color
        .as_deref()
        .map(|c| format!("{} 컬러로 ", c))
        .unwrap_or_default();

    match (filters.category.as_deref(), filters.style.as_deref()) {
        (Some(category), Some(style)) => {
            format!("😊 {} 중에서 {} 스타일을 {}골라봤어요!", category, style, color)
        },
        (Some(category), None) => format!("👕 {} {}추천해드릴게요!", category, color),
        (None, Some(style)) => format!("💡 {} 스타일의 옷을 {}찾아봤어요!", style, color),
        (None, None) => format!("😊 {}이런 상품들은 어떠세요?", color),
    }
}

fn feedback_lead_in(kind: FeedbackKind, refinement: Option<Refinement>) -> String {
    let text = match (kind, refinement) {
        (FeedbackKind::Narrower, Some(Refinement::Cheaper)) => {
            "💰 더 저렴한 옵션을 찾아드릴게요! 가성비 좋은 상품들을 추천해드릴게요."
        },
        (FeedbackKind::Narrower, Some(Refinement::DifferentStyle)) => {
            "🔄 다른 스타일로 추천해드릴게요!"
        },
        (FeedbackKind::Narrower, Some(Refinement::MoreTrendy)) => {
            "🔥 트렌디한 상품들을 찾아드릴게요! 요즘 인기 있는 스타일로 추천해드릴게요."
        },
        (FeedbackKind::Narrower, Some(Refinement::BetterQuality)) => {
            "✨ 평점이 높은 상품 위주로 다시 골라봤어요."
        },
        (FeedbackKind::Narrower, None) => "💡 다른 옵션을 찾아드릴게요!",
        (FeedbackKind::Broader, _) => "🔍 조건을 조금 넓혀서 더 많은 상품을 찾아봤어요.",
        (FeedbackKind::Negative, _) => "🙏 아쉬우셨군요. 다른 상품으로 다시 골라봤어요.",
        (FeedbackKind::Positive, _) => {
            "😊 마음에 드셨다니 다행이에요! 더 필요한 게 있으면 말씀해주세요."
        },
        (FeedbackKind::Behavioral, _) => "🛍️ 알려주셔서 감사해요! 다음 추천에 반영할게요.",
    };
    text.to_string()
}

fn greeting() -> String {
    let mut rng = rand::thread_rng();
    let hello = GREETINGS.choose(&mut rng).copied().unwrap_or("안녕하세요!");
    format!("{}{}", hello, CHITCHAT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylist_core::{ConversationResult, Feedback, Product, Recommendation};

    fn rec() -> Recommendation {
        Recommendation {
            product: Product::new("p1", "스트릿 반팔", "상의"),
            similarity: 0.9,
            rating_score: 0.9,
            review_score: 0.5,
            final_score: 0.82,
            reason: "요청과 잘 맞아요".to_string(),
        }
    }

    #[test]
    fn test_chitchat_greets() {
        let state = SessionState {
            conversation_result: Some(ConversationResult::chitchat()),
            ..Default::default()
        };
        let text = TemplateResponseGenerator::new().lead_in(&state);
        assert!(text.ends_with(CHITCHAT_SUFFIX));
    }

    #[test]
    fn test_recommendation_lead_in_names_filters() {
        let state = SessionState {
            conversation_result: Some(ConversationResult::new(
                Intent::RecommendationRequest,
                SearchFilters::new(),
            )),
            filters: SearchFilters::new().category("상의").style("스트릿"),
            recommendations: vec![rec()],
            ..Default::default()
        };
        let text = TemplateResponseGenerator::new().lead_in(&state);
        assert!(text.contains("상의"));
        assert!(text.contains("스트릿"));
    }

    #[test]
    fn test_empty_results() {
        let state = SessionState {
            conversation_result: Some(ConversationResult::new(
                Intent::RecommendationRequest,
                SearchFilters::new(),
            )),
            ..Default::default()
        };
        assert_eq!(TemplateResponseGenerator::new().lead_in(&state), NO_RESULTS);
    }

    #[tokio::test]
    async fn test_feedback_lead_in() {
        let state = SessionState {
            feedback: Some(
                Feedback::new(FeedbackKind::Narrower).with_refinement(Refinement::Cheaper),
            ),
            recommendations: vec![rec()],
            ..Default::default()
        };
        let text = TemplateResponseGenerator::new().generate(&state).await.unwrap();
        assert!(text.starts_with("💰"));
    }
}
