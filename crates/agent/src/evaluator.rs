//! Recommendation quality evaluation
//!
//! Scores a recommendation set on four axes:
//!
//! | axis      | measure                                             | weight |
//! |-----------|-----------------------------------------------------|--------|
//! | relevance | mean similarity                                     | 0.40   |
//! | diversity | 1 - share of the most common category               | 0.25   |
//! | novelty   | share of ids not shown earlier in the session       | 0.20   |
//! | coverage  | `min(1, returned / requested)`                      | 0.15   |
//!
//! An overall score of 0.8 or more is excellent, 0.6 or more is good, and
//! anything lower sends the workflow back to retrieval.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use stylist_config::constants::evaluation;
use stylist_core::{Adjustment, EvaluationResult, QualityLevel, Recommendation};

pub const EMPTY_SET_SUGGESTION: &str = "추천 결과가 없습니다. 더 많은 상품을 검색해보세요.";
pub const NO_ISSUES_SUGGESTION: &str = "현재 추천 품질이 양호합니다";

const RELEVANCE_SUGGESTION: &str = "사용자 쿼리와 더 관련성 높은 상품을 추천하세요";
const DIVERSITY_SUGGESTION: &str = "다양한 카테고리와 스타일의 상품을 포함하세요";
const NOVELTY_SUGGESTION: &str = "사용자가 이전에 본 상품과 다른 새로운 상품을 추천하세요";
const COVERAGE_SUGGESTION: &str = "요청된 개수만큼 충분한 상품을 추천하세요";

/// What the evaluator needs to know about the request
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Products shown earlier in the session
    pub seen_ids: &'a BTreeSet<String>,
    pub requested_top_k: usize,
}

/// Quality verdict strategy consumed by the workflow
pub trait RecommendationEvaluator: Send + Sync {
    fn evaluate(
        &self,
        recommendations: &[Recommendation],
        context: &EvaluationContext<'_>,
    ) -> EvaluationResult;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityWeights {
    pub relevance: f32,
    pub diversity: f32,
    pub novelty: f32,
    pub coverage: f32,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            relevance: evaluation::RELEVANCE_WEIGHT,
            diversity: evaluation::DIVERSITY_WEIGHT,
            novelty: evaluation::NOVELTY_WEIGHT,
            coverage: evaluation::COVERAGE_WEIGHT,
        }
    }
}

/// Step function of the overall score
pub fn quality_level(overall_score: f32) -> QualityLevel {
    if overall_score >= evaluation::EXCELLENT_THRESHOLD {
        QualityLevel::Excellent
    } else if overall_score >= evaluation::GOOD_THRESHOLD {
        QualityLevel::Good
    } else {
        QualityLevel::NeedsImprovement
    }
}

pub fn relevance(recommendations: &[Recommendation]) -> f32 {
    if recommendations.is_empty() {
        return 0.0;
    }
    let total: f32 = recommendations.iter().map(|r| r.similarity.clamp(0.0, 1.0)).sum();
    total / recommendations.len() as f32
}

pub fn diversity(recommendations: &[Recommendation]) -> f32 {
    if recommendations.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in recommendations {
        *counts.entry(r.product.category.as_str()).or_insert(0) += 1;
    }
    let most_common = counts.values().copied().max().unwrap_or(0);
    1.0 - most_common as f32 / recommendations.len() as f32
}

pub fn novelty(recommendations: &[Recommendation], seen_ids: &BTreeSet<String>) -> f32 {
    if recommendations.is_empty() {
        return 0.0;
    }
    let fresh = recommendations
        .iter()
        .filter(|r| !seen_ids.contains(&r.product.id))
        .count();
    fresh as f32 / recommendations.len() as f32
}

pub fn coverage(returned: usize, requested_top_k: usize) -> f32 {
    if requested_top_k == 0 {
        return if returned > 0 { 1.0 } else { 0.0 };
    }
    (returned as f32 / requested_top_k as f32).min(1.0)
}

/// One entry of the evaluation history
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    pub timestamp: DateTime<Utc>,
    pub overall_score: f32,
    pub quality_level: QualityLevel,
}

/// Aggregate over recent evaluations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub total_evaluations: usize,
    pub average_score: f32,
    pub score_std: f32,
    pub quality_distribution: BTreeMap<String, usize>,
    /// `improving` when the latest score beats the first in the window
    pub recent_trend: String,
}

/// Four-axis evaluator with a bounded history
pub struct QualityEvaluator {
    weights: QualityWeights,
    history: Mutex<VecDeque<EvaluationRecord>>,
    capacity: usize,
}

impl Default for QualityEvaluator {
    fn default() -> Self {
        Self::new(evaluation::HISTORY_CAPACITY)
    }
}

impl QualityEvaluator {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            weights: QualityWeights::default(),
            history: Mutex::new(VecDeque::with_capacity(history_capacity.min(1024))),
            capacity: history_capacity.max(1),
        }
    }

    pub fn with_weights(mut self, weights: QualityWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Pure scoring; does not touch the history
    pub fn score(
        &self,
        recommendations: &[Recommendation],
        context: &EvaluationContext<'_>,
    ) -> EvaluationResult {
        if recommendations.is_empty() {
            return EvaluationResult {
                relevance: 0.0,
                diversity: 0.0,
                novelty: 0.0,
                coverage: 0.0,
                overall_score: 0.0,
                quality_level: QualityLevel::NeedsImprovement,
                suggestions: vec![EMPTY_SET_SUGGESTION.to_string()],
                adjustments: vec![Adjustment::RelaxSoftFilter, Adjustment::WidenCandidatePool],
            };
        }

        let relevance = relevance(recommendations);
        let diversity = diversity(recommendations);
        let novelty = novelty(recommendations, context.seen_ids);
        let coverage = coverage(recommendations.len(), context.requested_top_k);

        let w = &self.weights;
        let overall_score = (w.relevance * relevance
            + w.diversity * diversity
            + w.novelty * novelty
            + w.coverage * coverage)
            .clamp(0.0, 1.0);

        let (suggestions, adjustments) = suggest(relevance, diversity, novelty, coverage);

        EvaluationResult {
            relevance,
            diversity,
            novelty,
            coverage,
            overall_score,
            quality_level: quality_level(overall_score),
            suggestions,
            adjustments,
        }
    }

    fn record(&self, result: &EvaluationResult) {
        let mut history = self.history.lock();
        if history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(EvaluationRecord {
            timestamp: Utc::now(),
            overall_score: result.overall_score,
            quality_level: result.quality_level,
        });
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Summary of evaluations newer than `window`; `None` when there are none
    pub fn summary(&self, window: Duration) -> Option<EvaluationSummary> {
        let cutoff = Utc::now() - window;
        let history = self.history.lock();
        let recent: Vec<&EvaluationRecord> =
            history.iter().filter(|r| r.timestamp > cutoff).collect();
        if recent.is_empty() {
            return None;
        }

        let scores: Vec<f32> = recent.iter().map(|r| r.overall_score).collect();
        let n = scores.len() as f32;
        let average = scores.iter().sum::<f32>() / n;
        let variance = scores.iter().map(|s| (s - average).powi(2)).sum::<f32>() / n;

        let mut distribution: BTreeMap<String, usize> = [
            QualityLevel::Excellent,
            QualityLevel::Good,
            QualityLevel::NeedsImprovement,
        ]
        .iter()
        .map(|l| (l.as_str().to_string(), 0))
        .collect();
        for r in &recent {
            *distribution.entry(r.quality_level.as_str().to_string()).or_insert(0) += 1;
        }

        let improving = scores.len() >= 2 && scores[scores.len() - 1] > scores[0];

        Some(EvaluationSummary {
            total_evaluations: recent.len(),
            average_score: average,
            score_std: variance.sqrt(),
            quality_distribution: distribution,
            recent_trend: (if improving { "improving" } else { "stable" }).to_string(),
        })
    }
}

impl RecommendationEvaluator for QualityEvaluator {
    fn evaluate(
        &self,
        recommendations: &[Recommendation],
        context: &EvaluationContext<'_>,
    ) -> EvaluationResult {
        let result = self.score(recommendations, context);
        self.record(&result);

        tracing::debug!(
            overall = result.overall_score,
            quality = ?result.quality_level,
            relevance = result.relevance,
            diversity = result.diversity,
            novelty = result.novelty,
            coverage = result.coverage,
            "Recommendations evaluated"
        );

        result
    }

    fn name(&self) -> &str {
        "quality"
    }
}

fn suggest(
    relevance: f32,
    diversity: f32,
    novelty: f32,
    coverage: f32,
) -> (Vec<String>, Vec<Adjustment>) {
    let threshold = evaluation::SUGGESTION_THRESHOLD;
    let axes: [(f32, &str, &[Adjustment]); 4] = [
        (relevance, RELEVANCE_SUGGESTION, &[Adjustment::WidenCandidatePool]),
        (diversity, DIVERSITY_SUGGESTION, &[Adjustment::RelaxSoftFilter]),
        (novelty, NOVELTY_SUGGESTION, &[Adjustment::ExcludeShown]),
        (
            coverage,
            COVERAGE_SUGGESTION,
            &[Adjustment::RelaxSoftFilter, Adjustment::WidenCandidatePool],
        ),
    ];

    let mut suggestions = Vec::new();
    let mut adjustments: Vec<Adjustment> = Vec::new();
    for (value, text, fixes) in axes {
        if value < threshold {
            suggestions.push(text.to_string());
            for fix in fixes {
                if !adjustments.contains(fix) {
                    adjustments.push(*fix);
                }
            }
        }
    }

    if suggestions.is_empty() {
        suggestions.push(NO_ISSUES_SUGGESTION.to_string());
    }
    (suggestions, adjustments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylist_core::Product;

    fn rec(id: &str, category: &str, similarity: f32) -> Recommendation {
        Recommendation {
            product: Product::new(id, id, category),
            similarity,
            rating_score: 0.0,
            review_score: 0.0,
            final_score: 0.5 * similarity,
            reason: String::new(),
        }
    }

    fn context(seen: &BTreeSet<String>, top_k: usize) -> EvaluationContext<'_> {
        EvaluationContext {
            seen_ids: seen,
            requested_top_k: top_k,
        }
    }

    #[test]
    fn test_quality_boundaries() {
        assert_eq!(quality_level(0.599), QualityLevel::NeedsImprovement);
        assert_eq!(quality_level(0.6), QualityLevel::Good);
        assert_eq!(quality_level(0.799), QualityLevel::Good);
        assert_eq!(quality_level(0.8), QualityLevel::Excellent);
    }

    #[test]
    fn test_axes() {
        let seen: BTreeSet<String> = ["a".to_string()].into_iter().collect();
        let recs = vec![
            rec("a", "상의", 0.9),
            rec("b", "상의", 0.7),
            rec("c", "하의", 0.8),
            rec("d", "신발", 0.6),
        ];
        let result = QualityEvaluator::default().score(&recs, &context(&seen, 5));

        assert!((result.relevance - 0.75).abs() < 1e-6);
        assert!((result.diversity - 0.5).abs() < 1e-6);
        assert!((result.novelty - 0.75).abs() < 1e-6);
        assert!((result.coverage - 0.8).abs() < 1e-6);
        let expected = 0.4 * 0.75 + 0.25 * 0.5 + 0.2 * 0.75 + 0.15 * 0.8;
        assert!((result.overall_score - expected).abs() < 1e-6);
        assert_eq!(result.quality_level, QualityLevel::Good);
        assert_eq!(result.suggestions, vec![NO_ISSUES_SUGGESTION]);
        assert!(result.adjustments.is_empty());
    }

    #[test]
    fn test_empty_set() {
        let seen = BTreeSet::new();
        let result = QualityEvaluator::default().score(&[], &context(&seen, 5));
        assert_eq!(result.overall_score, 0.0);
        assert_eq!(result.quality_level, QualityLevel::NeedsImprovement);
        assert_eq!(result.suggestions, vec![EMPTY_SET_SUGGESTION]);
    }

    #[test]
    fn test_low_axes_produce_suggestions_and_adjustments() {
        let seen: BTreeSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let recs = vec![rec("a", "상의", 0.2), rec("b", "상의", 0.3)];
        let result = QualityEvaluator::default().score(&recs, &context(&seen, 5));

        assert_eq!(result.suggestions.len(), 4);
        assert_eq!(result.suggestions[1], DIVERSITY_SUGGESTION);
        assert_eq!(
            result.adjustments,
            vec![
                Adjustment::WidenCandidatePool,
                Adjustment::RelaxSoftFilter,
                Adjustment::ExcludeShown
            ]
        );
        assert!(result.needs_improvement());
    }

    #[test]
    fn test_overall_in_unit_range() {
        let seen = BTreeSet::new();
        let recs = vec![rec("a", "상의", 1.0), rec("b", "하의", 1.0)];
        let result = QualityEvaluator::default().score(&recs, &context(&seen, 1));
        assert!(result.overall_score <= 1.0);
        assert_eq!(result.coverage, 1.0);
    }

    #[test]
    fn test_history_is_bounded_and_summarized() {
        let evaluator = QualityEvaluator::new(3);
        let seen = BTreeSet::new();
        evaluator.evaluate(&[], &context(&seen, 5));
        for _ in 0..3 {
            evaluator.evaluate(
                &[rec("a", "상의", 1.0), rec("b", "하의", 1.0)],
                &context(&seen, 2),
            );
        }
        assert_eq!(evaluator.history_len(), 3);

        let summary = evaluator.summary(Duration::days(7)).unwrap();
        assert_eq!(summary.total_evaluations, 3);
        assert_eq!(summary.quality_distribution["excellent"], 3);
        assert_eq!(summary.recent_trend, "stable");
        assert!(summary.score_std.abs() < 1e-6);
    }

    #[test]
    fn test_summary_trend() {
        let evaluator = QualityEvaluator::default();
        let seen = BTreeSet::new();
        evaluator.evaluate(&[], &context(&seen, 5));
        evaluator.evaluate(&[rec("a", "상의", 0.9)], &context(&seen, 1));
        let summary = evaluator.summary(Duration::days(1)).unwrap();
        assert_eq!(summary.recent_trend, "improving");
        assert!(QualityEvaluator::default().summary(Duration::days(1)).is_none());
    }
}
