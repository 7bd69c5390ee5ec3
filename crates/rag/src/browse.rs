//! Browse and discovery over an index snapshot
//!
//! None of these need a query embedding. Results reuse the recommendation
//! shape with `similarity = 0`.

use stylist_config::constants::retrieval;
use stylist_core::{Product, Recommendation};

use crate::index::ProductIndex;
use crate::scoring::{browse_score, compare_ranked, rating_score, review_score, trending_score};

fn browse_item(product: &Product, score: f32, reason: String) -> Recommendation {
    Recommendation {
        product: product.clone(),
        similarity: 0.0,
        rating_score: rating_score(product.rating),
        review_score: review_score(product.review_count),
        final_score: score,
        reason,
    }
}

fn top_by<F>(candidates: Vec<&Product>, top_k: usize, score: F) -> Vec<(&Product, f32)>
where
    F: Fn(&Product) -> f32,
{
    let mut scored: Vec<(&Product, f32)> = candidates.into_iter().map(|p| (p, score(p))).collect();
    scored.sort_by(|(a, sa), (b, sb)| compare_ranked(*sa, a, *sb, b));
    scored.truncate(top_k);
    scored
}

/// Best rated and most reviewed products, optionally within a category
pub fn trending(index: &ProductIndex, top_k: usize, category: Option<&str>) -> Vec<Recommendation> {
    let candidates: Vec<&Product> = index
        .products()
        .iter()
        .filter(|p| category.map_or(true, |c| p.in_category(c)))
        .collect();

    top_by(candidates, top_k, trending_score)
        .into_iter()
        .map(|(p, score)| {
            browse_item(
                p,
                score,
                format!("평점 {:.1}, 리뷰 {}개의 인기 상품이에요", p.rating.unwrap_or(0.0), p.review_count),
            )
        })
        .collect()
}

/// Highly rated products within a category
pub fn by_category(
    index: &ProductIndex,
    category: &str,
    top_k: usize,
    min_rating: Option<f32>,
) -> Vec<Recommendation> {
    let min_rating = min_rating.unwrap_or(retrieval::BROWSE_MIN_RATING);
    let candidates: Vec<&Product> = index
        .products()
        .iter()
        .filter(|p| p.in_category(category))
        .filter(|p| p.rating.map_or(false, |r| r >= min_rating))
        .collect();

    top_by(candidates, top_k, browse_score)
        .into_iter()
        .map(|(p, score)| browse_item(p, score, format!("{} 카테고리 평점 상위 상품이에요", category)))
        .collect()
}

/// Query refinements built from popular keywords the query lacks
pub fn suggestions(query: &str, top_k: usize) -> Vec<String> {
    let query = query.trim();
    let lowered = query.to_lowercase();
    retrieval::SUGGESTION_KEYWORDS
        .iter()
        .filter(|k| !lowered.contains(*k))
        .map(|k| {
            if query.is_empty() {
                (*k).to_string()
            } else {
                format!("{} {}", query, k)
            }
        })
        .take(top_k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> ProductIndex {
        let products = vec![
            Product::new("a", "베이직 반팔", "상의").with_rating(4.8, 1000),
            Product::new("b", "스트릿 후드", "상의").with_rating(4.1, 20),
            Product::new("c", "데님 팬츠", "하의").with_rating(4.5, 300),
            Product::new("d", "신상 셔츠", "상의"),
        ]
        .into_iter()
        .map(|p| p.with_embedding(vec![1.0]))
        .collect();
        ProductIndex::build(products, 1, 1).unwrap()
    }

    #[test]
    fn test_trending() {
        let index = index();
        let all = trending(&index, 10, None);
        assert_eq!(all[0].product.id, "a");
        assert_eq!(all.last().map(|r| r.product.id.as_str()), Some("d"));

        let tops = trending(&index, 10, Some("상의"));
        assert_eq!(tops.len(), 3);
        assert!(tops.iter().all(|r| r.product.category == "상의"));
    }

    #[test]
    fn test_category_browse_rating_floor() {
        let index = index();
        let results = by_category(&index, "상의", 10, None);
        let ids: Vec<&str> = results.iter().map(|r| r.product.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let strict = by_category(&index, "상의", 10, Some(4.5));
        assert_eq!(strict.len(), 1);
    }

    #[test]
    fn test_suggestions_skip_contained_keywords() {
        let s = suggestions("오버핏 반팔", 3);
        assert_eq!(s, vec!["오버핏 반팔 베이직", "오버핏 반팔 스트릿", "오버핏 반팔 꾸안꾸"]);
        assert_eq!(suggestions("셔츠", 20).len(), 9);
    }
}
