//! Product vector index
//!
//! [`ProductIndex`] is immutable once built. [`IndexHandle`] owns the current
//! index behind an `Arc` and replaces it wholesale on reindex, so a reader
//! holding a snapshot keeps a consistent view until it drops it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use stylist_core::{FilterKey, PriceTiers, Product, SearchFilters};

use crate::embeddings::cosine_similarity;
use crate::RagError;

/// Nearest-neighbour hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position in [`ProductIndex::products`]
    pub position: usize,
    /// Raw cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Immutable product collection with vectors
#[derive(Debug)]
pub struct ProductIndex {
    version: u64,
    dimension: usize,
    products: Vec<Product>,
    by_id: HashMap<String, usize>,
    built_at: DateTime<Utc>,
}

impl ProductIndex {
    /// Build an index; every product needs a `dimension`-long embedding
    pub fn build(products: Vec<Product>, dimension: usize, version: u64) -> Result<Self, RagError> {
        let mut by_id = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            if product.embedding.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: product.embedding.len(),
                });
            }
            if by_id.insert(product.id.clone(), position).is_some() {
                return Err(RagError::Index(format!("duplicate product id: {}", product.id)));
            }
        }

        Ok(Self {
            version,
            dimension,
            products,
            by_id,
            built_at: Utc::now(),
        })
    }

    pub fn empty(dimension: usize) -> Self {
        Self {
            version: 0,
            dimension,
            products: Vec::new(),
            by_id: HashMap::new(),
            built_at: Utc::now(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).map(|&i| &self.products[i])
    }

    /// `k` most similar products, similarity descending then id ascending
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Neighbor> = self
            .products
            .iter()
            .enumerate()
            .map(|(position, p)| Neighbor {
                position,
                similarity: cosine_similarity(query, &p.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| self.products[a.position].id.cmp(&self.products[b.position].id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Number of products each active filter would let through on its own
    pub fn match_counts(
        &self,
        filters: &SearchFilters,
        tiers: &PriceTiers,
    ) -> BTreeMap<FilterKey, usize> {
        filters
            .active_keys()
            .into_iter()
            .map(|key| {
                let count = self
                    .products
                    .iter()
                    .filter(|p| filters.matches_key(key, p, tiers))
                    .count();
                (key, count)
            })
            .collect()
    }

    /// Distinct categories with product counts, most populated first
    pub fn categories(&self) -> Vec<CategoryCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for product in &self.products {
            *counts.entry(product.category.as_str()).or_insert(0) += 1;
        }
        let mut categories: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        categories.sort_by(|a, b| match b.count.cmp(&a.count) {
            Ordering::Equal => a.category.cmp(&b.category),
            other => other,
        });
        categories
    }

    pub fn distinct_brands(&self) -> usize {
        self.products
            .iter()
            .filter_map(|p| p.brand.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Swappable owner of the current index
pub struct IndexHandle {
    current: RwLock<Arc<ProductIndex>>,
}

impl IndexHandle {
    pub fn new(index: ProductIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn empty(dimension: usize) -> Self {
        Self::new(ProductIndex::empty(dimension))
    }

    /// Current index; stays valid after a later swap
    pub fn snapshot(&self) -> Arc<ProductIndex> {
        Arc::clone(&*self.current.read())
    }

    /// Replace the current index, returning the previous one
    pub fn swap(&self, index: ProductIndex) -> Arc<ProductIndex> {
        let next = Arc::new(index);
        let mut guard = self.current.write();
        tracing::info!(
            previous_version = guard.version(),
            version = next.version(),
            products = next.len(),
            "Index swapped"
        );
        std::mem::replace(&mut *guard, next)
    }

    /// Version the next built index should carry
    pub fn next_version(&self) -> u64 {
        self.current.read().version() + 1
    }

    pub fn version(&self) -> u64 {
        self.current.read().version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, category: &str, embedding: Vec<f32>) -> Product {
        Product::new(id, id, category).with_embedding(embedding)
    }

    #[test]
    fn test_nearest_orders_and_breaks_ties_by_id() {
        let index = ProductIndex::build(
            vec![
                product("b", "상의", vec![1.0, 0.0]),
                product("a", "상의", vec![1.0, 0.0]),
                product("c", "하의", vec![0.0, 1.0]),
            ],
            2,
            1,
        )
        .unwrap();

        let hits = index.nearest(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits
            .iter()
            .map(|h| index.products()[h.position].id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = ProductIndex::build(vec![product("a", "상의", vec![1.0, 0.0])], 2, 1).unwrap();
        assert!(matches!(
            index.nearest(&[1.0, 0.0, 0.0], 1),
            Err(RagError::DimensionMismatch { expected: 2, actual: 3 })
        ));

        let err = ProductIndex::build(vec![product("x", "상의", vec![1.0])], 2, 1).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = ProductIndex::build(
            vec![
                product("a", "상의", vec![1.0]),
                product("a", "하의", vec![1.0]),
            ],
            1,
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_swap_keeps_old_snapshot_alive() {
        let handle = IndexHandle::new(
            ProductIndex::build(vec![product("old", "상의", vec![1.0])], 1, 1).unwrap(),
        );
        let before = handle.snapshot();

        let next = ProductIndex::build(
            vec![
                product("new1", "상의", vec![1.0]),
                product("new2", "하의", vec![1.0]),
            ],
            1,
            handle.next_version(),
        )
        .unwrap();
        let previous = handle.swap(next);

        assert_eq!(before.len(), 1);
        assert_eq!(previous.version(), 1);
        assert_eq!(handle.snapshot().len(), 2);
        assert_eq!(handle.version(), 2);
    }

    #[test]
    fn test_categories_and_match_counts() {
        let index = ProductIndex::build(
            vec![
                product("1", "상의", vec![1.0]).with_colors(["블랙"]),
                product("2", "상의", vec![1.0]),
                product("3", "하의", vec![1.0]).with_colors(["블랙"]),
            ],
            1,
            1,
        )
        .unwrap();

        let categories = index.categories();
        assert_eq!(categories[0], CategoryCount { category: "상의".into(), count: 2 });

        let filters = SearchFilters::new().category("상의").color("블랙");
        let counts = index.match_counts(&filters, &PriceTiers::default());
        assert_eq!(counts[&FilterKey::Category], 2);
        assert_eq!(counts[&FilterKey::Color], 2);
    }
}
