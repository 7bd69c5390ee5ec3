//! Conversational cue words for intent and feedback classification

use stylist_core::{BehaviorSignal, FeedbackKind, Refinement};

use crate::lexicon::{contains_any, contains_keyword};

/// Words that ask for recommendations
pub const RECOMMENDATION: &[&str] = &["추천", "보여줘", "찾아줘", "없어", "어떤", "뭐가"];

pub const BEHAVIORAL: &[&str] = &["샀어", "구매", "클릭", "주문"];
pub const NEGATIVE: &[&str] = &["별로", "싫어", "마음에 안", "아니"];
pub const BROADER: &[&str] = &["더 보여", "더 많이", "다른 것도", "다른 거"];
pub const POSITIVE: &[&str] = &["좋아", "마음에 들", "괜찮", "감사", "고마워"];

/// Narrower-feedback flavors, checked in order
pub const REFINEMENTS: &[(Refinement, &[&str])] = &[
    (Refinement::Cheaper, &["저렴한", "싼", "가격 낮은"]),
    (Refinement::DifferentStyle, &["다른 스타일", "다른 느낌", "변화"]),
    (Refinement::BetterQuality, &["품질 좋은", "내구성", "오래가는"]),
    (Refinement::MoreTrendy, &["트렌디한", "유행", "인기", "핫한"]),
];

pub fn asks_for_recommendation(text: &str) -> bool {
    contains_any(text, RECOMMENDATION)
}

pub fn detect_refinement(text: &str) -> Option<Refinement> {
    REFINEMENTS
        .iter()
        .find(|(_, keywords)| contains_any(text, keywords))
        .map(|(refinement, _)| *refinement)
}

/// Feedback kind named by `text`
///
/// Precedence: behavioral, negative, narrower, broader, positive.
pub fn detect_feedback_kind(text: &str) -> Option<FeedbackKind> {
    if contains_any(text, BEHAVIORAL) {
        Some(FeedbackKind::Behavioral)
    } else if contains_any(text, NEGATIVE) {
        Some(FeedbackKind::Negative)
    } else if detect_refinement(text).is_some() {
        Some(FeedbackKind::Narrower)
    } else if contains_any(text, BROADER) {
        Some(FeedbackKind::Broader)
    } else if contains_any(text, POSITIVE) {
        Some(FeedbackKind::Positive)
    } else {
        None
    }
}

pub fn detect_signal(text: &str) -> BehaviorSignal {
    if contains_keyword(text, "클릭") {
        BehaviorSignal::Click
    } else if ["샀어", "구매", "주문"]
        .iter()
        .any(|k| contains_keyword(text, k))
    {
        BehaviorSignal::Purchase
    } else {
        BehaviorSignal::Like
    }
}
