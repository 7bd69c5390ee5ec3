//! Metadata filters applied as hard predicates during retrieval

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::product::Product;

/// Price tier labels used in conversation ("저렴", "보통", "고급")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Budget,
    Mid,
    Premium,
}

impl PriceTier {
    pub fn label(&self) -> &'static str {
        match self {
            PriceTier::Budget => "저렴",
            PriceTier::Mid => "보통",
            PriceTier::Premium => "고급",
        }
    }

    /// Parse either the Korean label or the snake_case name
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "저렴" | "budget" | "low" | "lower" => Some(PriceTier::Budget),
            "보통" | "mid" | "middle" => Some(PriceTier::Mid),
            "고급" | "premium" | "high" => Some(PriceTier::Premium),
            _ => None,
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Tier boundaries in KRW
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTiers {
    /// Inclusive upper bound of the budget tier
    pub budget_ceiling: u32,
    /// Inclusive upper bound of the mid tier
    pub mid_ceiling: u32,
}

impl Default for PriceTiers {
    fn default() -> Self {
        Self {
            budget_ceiling: 30_000,
            mid_ceiling: 70_000,
        }
    }
}

impl PriceTiers {
    pub fn tier_of(&self, price: u32) -> PriceTier {
        if price <= self.budget_ceiling {
            PriceTier::Budget
        } else if price <= self.mid_ceiling {
            PriceTier::Mid
        } else {
            PriceTier::Premium
        }
    }

    /// Upper bound of a tier; premium is unbounded
    pub fn ceiling(&self, tier: PriceTier) -> Option<u32> {
        match tier {
            PriceTier::Budget => Some(self.budget_ceiling),
            PriceTier::Mid => Some(self.mid_ceiling),
            PriceTier::Premium => None,
        }
    }

    /// Next lower ceiling below `bound`. A premium-only search steps down to
    /// the mid tier, any other unbounded search drops to the budget tier, and
    /// below the budget tier the bound halves.
    pub fn lower_ceiling(&self, bound: Option<u32>, tier: Option<PriceTier>) -> u32 {
        match bound {
            None if tier == Some(PriceTier::Premium) => self.mid_ceiling,
            None => self.budget_ceiling,
            Some(b) if b > self.mid_ceiling => self.mid_ceiling,
            Some(b) if b > self.budget_ceiling => self.budget_ceiling,
            Some(b) => (b / 2).max(1),
        }
    }

    /// Next higher ceiling above `bound`, `None` once past the mid tier
    pub fn higher_ceiling(&self, bound: u32) -> Option<u32> {
        if bound < self.budget_ceiling {
            Some(self.budget_ceiling)
        } else if bound < self.mid_ceiling {
            Some(self.mid_ceiling)
        } else {
            None
        }
    }
}

/// Filterable attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Category,
    Style,
    Color,
    PriceRange,
    MaxPrice,
    MinRating,
}

impl FilterKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Category => "category",
            FilterKey::Style => "style",
            FilterKey::Color => "color",
            FilterKey::PriceRange => "price_range",
            FilterKey::MaxPrice => "max_price",
            FilterKey::MinRating => "min_rating",
        }
    }

    pub fn is_price(&self) -> bool {
        matches!(self, FilterKey::PriceRange | FilterKey::MaxPrice)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New value for a filter, or its removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDelta {
    Set(String),
    Remove,
}

/// Active retrieval filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f32>,
    /// Products never returned regardless of score
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excluded_ids: BTreeSet<String>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn price_range(mut self, tier: PriceTier) -> Self {
        self.price_range = Some(tier);
        self
    }

    pub fn max_price(mut self, max_price: u32) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn min_rating(mut self, min_rating: f32) -> Self {
        self.min_rating = Some(min_rating);
        self
    }

    pub fn exclude(mut self, id: impl Into<String>) -> Self {
        self.excluded_ids.insert(id.into());
        self
    }

    /// Attribute filters currently set (exclusions not included)
    pub fn active_keys(&self) -> Vec<FilterKey> {
        let mut keys = Vec::new();
        if self.category.is_some() {
            keys.push(FilterKey::Category);
        }
        if self.style.is_some() {
            keys.push(FilterKey::Style);
        }
        if self.color.is_some() {
            keys.push(FilterKey::Color);
        }
        if self.price_range.is_some() {
            keys.push(FilterKey::PriceRange);
        }
        if self.max_price.is_some() {
            keys.push(FilterKey::MaxPrice);
        }
        if self.min_rating.is_some() {
            keys.push(FilterKey::MinRating);
        }
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.active_keys().is_empty() && self.excluded_ids.is_empty()
    }

    /// Effective price ceiling from `max_price` and `price_range`
    pub fn price_ceiling(&self, tiers: &PriceTiers) -> Option<u32> {
        let from_tier = self.price_range.and_then(|t| tiers.ceiling(t));
        match (self.max_price, from_tier) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn has_price_bound(&self) -> bool {
        self.max_price.is_some() || self.price_range.is_some()
    }

    /// Clear a single attribute filter
    pub fn remove(&mut self, key: FilterKey) {
        match key {
            FilterKey::Category => self.category = None,
            FilterKey::Style => self.style = None,
            FilterKey::Color => self.color = None,
            FilterKey::PriceRange => self.price_range = None,
            FilterKey::MaxPrice => self.max_price = None,
            FilterKey::MinRating => self.min_rating = None,
        }
    }

    /// Apply one delta, validating the new value
    pub fn apply_delta(&mut self, key: FilterKey, delta: &FilterDelta) -> Result<()> {
        let value = match delta {
            FilterDelta::Remove => {
                self.remove(key);
                return Ok(());
            },
            FilterDelta::Set(value) => value.trim(),
        };

        if value.is_empty() {
            return Err(Error::Validation(format!("empty value for filter {}", key)));
        }

        match key {
            FilterKey::Category => self.category = Some(value.to_string()),
            FilterKey::Style => self.style = Some(value.to_string()),
            FilterKey::Color => self.color = Some(value.to_string()),
            FilterKey::PriceRange => {
                let tier = PriceTier::parse(value).ok_or_else(|| {
                    Error::Validation(format!("unknown price range: {}", value))
                })?;
                self.price_range = Some(tier);
            },
            FilterKey::MaxPrice => {
                let max = value.parse::<u32>().map_err(|_| {
                    Error::Validation(format!("max_price must be a positive integer: {}", value))
                })?;
                if max == 0 {
                    return Err(Error::Validation("max_price must be positive".to_string()));
                }
                self.max_price = Some(max);
            },
            FilterKey::MinRating => {
                let min = value.parse::<f32>().map_err(|_| {
                    Error::Validation(format!("min_rating must be a number: {}", value))
                })?;
                if !(0.0..=5.0).contains(&min) {
                    return Err(Error::Validation(format!(
                        "min_rating must be within [0, 5], got {}",
                        min
                    )));
                }
                self.min_rating = Some(min);
            },
        }
        Ok(())
    }

    /// Merge a set of deltas, replacing conflicting keys
    pub fn merge_deltas(&mut self, deltas: &BTreeMap<FilterKey, FilterDelta>) -> Result<()> {
        for (key, delta) in deltas {
            self.apply_delta(*key, delta)?;
        }
        Ok(())
    }

    /// Overlay the attributes set in `other`; exclusions are unioned
    pub fn overlay(&mut self, other: &SearchFilters) {
        if other.category.is_some() {
            self.category = other.category.clone();
        }
        if other.style.is_some() {
            self.style = other.style.clone();
        }
        if other.color.is_some() {
            self.color = other.color.clone();
        }
        if other.price_range.is_some() {
            self.price_range = other.price_range;
        }
        if other.max_price.is_some() {
            self.max_price = other.max_price;
        }
        if other.min_rating.is_some() {
            self.min_rating = other.min_rating;
        }
        self.excluded_ids
            .extend(other.excluded_ids.iter().cloned());
    }

    /// Hard predicate: a product must satisfy every active filter
    pub fn matches(&self, product: &Product, tiers: &PriceTiers) -> bool {
        if self.excluded_ids.contains(&product.id) {
            return false;
        }
        self.active_keys()
            .into_iter()
            .all(|key| self.matches_key(key, product, tiers))
    }

    /// Whether `product` satisfies the single filter `key` (true when unset)
    pub fn matches_key(&self, key: FilterKey, product: &Product, tiers: &PriceTiers) -> bool {
        match key {
            FilterKey::Category => self
                .category
                .as_deref()
                .map_or(true, |c| product.in_category(c)),
            FilterKey::Style => self.style.as_deref().map_or(true, |s| product.has_style(s)),
            FilterKey::Color => self.color.as_deref().map_or(true, |c| product.has_color(c)),
            FilterKey::PriceRange => self.price_range.map_or(true, |tier| {
                product.price.map_or(false, |p| tiers.tier_of(p) == tier)
            }),
            FilterKey::MaxPrice => self
                .max_price
                .map_or(true, |max| product.price.map_or(false, |p| p <= max)),
            FilterKey::MinRating => self
                .min_rating
                .map_or(true, |min| product.rating.map_or(false, |r| r >= min)),
        }
    }

    /// Validate ranges of already-typed values
    pub fn validate(&self) -> Result<()> {
        if let Some(min) = self.min_rating {
            if !(0.0..=5.0).contains(&min) || min.is_nan() {
                return Err(Error::Validation(format!(
                    "min_rating must be within [0, 5], got {}",
                    min
                )));
            }
        }
        if self.max_price == Some(0) {
            return Err(Error::Validation("max_price must be positive".to_string()));
        }
        for (name, value) in [
            ("category", &self.category),
            ("style", &self.style),
            ("color", &self.color),
        ] {
            if value.as_deref().map(str::trim) == Some("") {
                return Err(Error::Validation(format!("empty value for filter {}", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tee(id: &str, price: u32) -> Product {
        Product::new(id, "스트릿 반팔 티셔츠", "상의")
            .with_styles(["스트릿", "오버핏"])
            .with_rating(4.5, 120)
            .with_price(price)
    }

    #[test]
    fn test_price_tiers() {
        let tiers = PriceTiers::default();
        assert_eq!(tiers.tier_of(30_000), PriceTier::Budget);
        assert_eq!(tiers.tier_of(30_001), PriceTier::Mid);
        assert_eq!(tiers.tier_of(90_000), PriceTier::Premium);
        assert_eq!(tiers.lower_ceiling(None, None), 30_000);
        assert_eq!(tiers.lower_ceiling(None, Some(PriceTier::Premium)), 70_000);
        assert_eq!(tiers.lower_ceiling(Some(90_000), None), 70_000);
        assert_eq!(tiers.lower_ceiling(Some(70_000), Some(PriceTier::Mid)), 30_000);
        assert_eq!(tiers.lower_ceiling(Some(30_000), None), 15_000);
        assert_eq!(tiers.higher_ceiling(30_000), Some(70_000));
        assert_eq!(tiers.higher_ceiling(70_000), None);
    }

    #[test]
    fn test_matches_all_active_filters() {
        let tiers = PriceTiers::default();
        let filters = SearchFilters::new().category("상의").style("스트릿").max_price(40_000);

        assert!(filters.matches(&tee("a", 25_000), &tiers));
        assert!(!filters.matches(&tee("b", 45_000), &tiers));

        let excluded = filters.clone().exclude("a");
        assert!(!excluded.matches(&tee("a", 25_000), &tiers));
    }

    #[test]
    fn test_missing_price_fails_price_filter() {
        let tiers = PriceTiers::default();
        let product = Product::new("x", "셔츠", "상의");
        assert!(SearchFilters::new().matches(&product, &tiers));
        assert!(!SearchFilters::new()
            .price_range(PriceTier::Budget)
            .matches(&product, &tiers));
    }

    #[test]
    fn test_apply_delta_validates() {
        let mut filters = SearchFilters::new().category("상의");
        filters
            .apply_delta(FilterKey::MaxPrice, &FilterDelta::Set("30000".into()))
            .unwrap();
        assert_eq!(filters.max_price, Some(30_000));

        filters
            .apply_delta(FilterKey::Category, &FilterDelta::Remove)
            .unwrap();
        assert!(filters.category.is_none());

        let err = filters
            .apply_delta(FilterKey::MinRating, &FilterDelta::Set("7".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = filters
            .apply_delta(FilterKey::PriceRange, &FilterDelta::Set("아주 비싼".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_price_ceiling_prefers_tighter_bound() {
        let tiers = PriceTiers::default();
        let filters = SearchFilters::new()
            .price_range(PriceTier::Mid)
            .max_price(50_000);
        assert_eq!(filters.price_ceiling(&tiers), Some(50_000));
        assert_eq!(SearchFilters::new().price_ceiling(&tiers), None);
    }

    #[test]
    fn test_overlay_replaces_and_unions_exclusions() {
        let mut base = SearchFilters::new().category("상의").style("베이직").exclude("a");
        let update = SearchFilters::new().style("스트릿").exclude("b");
        base.overlay(&update);
        assert_eq!(base.category.as_deref(), Some("상의"));
        assert_eq!(base.style.as_deref(), Some("스트릿"));
        assert_eq!(base.excluded_ids.len(), 2);
    }
}
