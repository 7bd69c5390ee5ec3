//! Hybrid scoring
//!
//! `final_score = 0.5 * similarity + 0.3 * rating / 5 + 0.2 * ln(reviews + 1) / 10`,
//! each term clamped to [0, 1] before weighting.

use std::cmp::Ordering;

use stylist_config::constants::scoring;
use stylist_core::{Product, Recommendation};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub similarity: f32,
    pub rating: f32,
    pub review: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            similarity: scoring::SIMILARITY_WEIGHT,
            rating: scoring::RATING_WEIGHT,
            review: scoring::REVIEW_WEIGHT,
        }
    }
}

/// Normalized score terms and their weighted sum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub similarity: f32,
    pub rating_score: f32,
    pub review_score: f32,
    pub final_score: f32,
}

/// Term contributing most to a final score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTerm {
    Similarity,
    Rating,
    Popularity,
}

fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// `rating / 5`, 0 when unrated
pub fn rating_score(rating: Option<f32>) -> f32 {
    rating.map_or(0.0, |r| unit(r / scoring::MAX_RATING))
}

/// `ln(review_count + 1) / 10`
pub fn review_score(review_count: u32) -> f32 {
    unit(((review_count as f64 + 1.0).ln() / scoring::REVIEW_LOG_DIVISOR as f64) as f32)
}

impl ScoreWeights {
    pub fn score(&self, similarity: f32, rating: Option<f32>, review_count: u32) -> ScoreBreakdown {
        let similarity = unit(similarity);
        let rating_score = rating_score(rating);
        let review_score = review_score(review_count);
        let final_score = unit(
            self.similarity * similarity + self.rating * rating_score + self.review * review_score,
        );
        ScoreBreakdown {
            similarity,
            rating_score,
            review_score,
            final_score,
        }
    }

    /// Largest weighted term; ties go to similarity, then rating
    pub fn dominant_term(&self, breakdown: &ScoreBreakdown) -> ScoreTerm {
        let sim = self.similarity * breakdown.similarity;
        let rating = self.rating * breakdown.rating_score;
        let popularity = self.review * breakdown.review_score;

        if sim >= rating && sim >= popularity {
            ScoreTerm::Similarity
        } else if rating >= popularity {
            ScoreTerm::Rating
        } else {
            ScoreTerm::Popularity
        }
    }
}

/// Human-readable reason for a recommendation
pub fn reason_text(term: ScoreTerm, product: &Product, breakdown: &ScoreBreakdown) -> String {
    match term {
        ScoreTerm::Similarity => format!(
            "요청하신 스타일과 잘 맞는 상품이에요 (유사도 {:.2})",
            breakdown.similarity
        ),
        ScoreTerm::Rating => format!(
            "평점 {:.1}점으로 만족도가 높은 상품이에요",
            product.rating.unwrap_or(0.0)
        ),
        ScoreTerm::Popularity => format!(
            "리뷰 {}개로 많은 분들이 선택한 상품이에요",
            product.review_count
        ),
    }
}

/// Build a scored recommendation
pub fn recommend(weights: &ScoreWeights, product: &Product, similarity: f32) -> Recommendation {
    let breakdown = weights.score(similarity, product.rating, product.review_count);
    let reason = reason_text(weights.dominant_term(&breakdown), product, &breakdown);
    Recommendation {
        product: product.clone(),
        similarity: breakdown.similarity,
        rating_score: breakdown.rating_score,
        review_score: breakdown.review_score,
        final_score: breakdown.final_score,
        reason,
    }
}

/// Ranking order: score desc, review count desc, id asc
pub fn compare_ranked(
    a_score: f32,
    a: &Product,
    b_score: f32,
    b: &Product,
) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| b.review_count.cmp(&a.review_count))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn compare_recommendations(a: &Recommendation, b: &Recommendation) -> Ordering {
    compare_ranked(a.final_score, &a.product, b.final_score, &b.product)
}

/// Trending score: `rating * ln(1 + reviews) / 10`
pub fn trending_score(product: &Product) -> f32 {
    let rating = product.rating.unwrap_or(0.0).max(0.0);
    rating * ((1.0 + product.review_count as f64).ln() as f32) / scoring::REVIEW_LOG_DIVISOR
}

/// Category browse score: rating-weighted blend without similarity
pub fn browse_score(product: &Product) -> f32 {
    scoring::BROWSE_RATING_WEIGHT * rating_score(product.rating)
        + scoring::BROWSE_REVIEW_WEIGHT * review_score(product.review_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula() {
        let w = ScoreWeights::default();
        let b = w.score(0.8, Some(4.5), 120);
        let expected = 0.5 * 0.8 + 0.3 * 0.9 + 0.2 * ((121f64).ln() as f32 / 10.0);
        assert!((b.final_score - expected).abs() < 1e-6);
        assert!((b.rating_score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_edge_terms() {
        let w = ScoreWeights::default();
        let b = w.score(-0.3, None, 0);
        assert_eq!(b.similarity, 0.0);
        assert_eq!(b.rating_score, 0.0);
        assert_eq!(b.review_score, 0.0);
        assert_eq!(b.final_score, 0.0);

        // ln(reviews + 1) / 10 saturates around 22k reviews
        assert_eq!(review_score(u32::MAX), 1.0);
        assert_eq!(rating_score(Some(7.0)), 1.0);
    }

    #[test]
    fn test_monotonic_in_each_input() {
        let w = ScoreWeights::default();
        let base = w.score(0.5, Some(3.0), 10).final_score;
        assert!(w.score(0.6, Some(3.0), 10).final_score >= base);
        assert!(w.score(0.5, Some(3.5), 10).final_score >= base);
        assert!(w.score(0.5, Some(3.0), 11).final_score >= base);
    }

    #[test]
    fn test_dominant_term() {
        let w = ScoreWeights::default();
        assert_eq!(w.dominant_term(&w.score(0.9, Some(4.0), 10)), ScoreTerm::Similarity);
        assert_eq!(w.dominant_term(&w.score(0.1, Some(5.0), 10)), ScoreTerm::Rating);
        assert_eq!(w.dominant_term(&w.score(0.0, None, 20_000)), ScoreTerm::Popularity);
        // exact tie goes to similarity
        let tie = ScoreBreakdown {
            similarity: 0.6,
            rating_score: 1.0,
            review_score: 0.0,
            final_score: 0.6,
        };
        assert_eq!(w.dominant_term(&tie), ScoreTerm::Similarity);
    }

    #[test]
    fn test_ranking_tie_breaks() {
        let a = Product::new("a", "a", "상의").with_rating(4.0, 10);
        let b = Product::new("b", "b", "상의").with_rating(4.0, 50);
        let c = Product::new("c", "c", "상의").with_rating(4.0, 50);

        assert_eq!(compare_ranked(0.5, &b, 0.5, &a), Ordering::Less);
        assert_eq!(compare_ranked(0.5, &b, 0.5, &c), Ordering::Less);
        assert_eq!(compare_ranked(0.7, &a, 0.5, &b), Ordering::Less);
    }

    #[test]
    fn test_trending_and_browse() {
        let p = Product::new("p", "p", "상의").with_rating(4.0, 99);
        assert!((trending_score(&p) - 4.0 * (100f32).ln() / 10.0).abs() < 1e-5);
        let expected = 0.6 * 0.8 + 0.4 * review_score(99);
        assert!((browse_score(&p) - expected).abs() < 1e-6);
    }
}
