//! Catalog product record

use serde::{Deserialize, Serialize};

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub style_keywords: Vec<String>,
    /// Average rating in [0, 5]; `None` when the product has no ratings yet
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub review_count: u32,
    /// Empty until the catalog loader embeds the product
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// Price in KRW
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            style_keywords: Vec::new(),
            rating: None,
            review_count: 0,
            embedding: Vec::new(),
            url: String::new(),
            image_url: None,
            brand: None,
            price: None,
            colors: Vec::new(),
            description: None,
        }
    }

    pub fn with_styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.style_keywords = styles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rating(mut self, rating: f32, review_count: u32) -> Self {
        self.rating = Some(rating);
        self.review_count = review_count;
        self
    }

    pub fn with_price(mut self, price: u32) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Text used to embed the product
    pub fn embedding_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str(), self.category.as_str()];
        if let Some(ref description) = self.description {
            parts.push(description);
        }
        parts.extend(self.style_keywords.iter().map(String::as_str));
        parts.extend(self.colors.iter().map(String::as_str));
        parts.join(" ")
    }

    pub fn has_style(&self, style: &str) -> bool {
        self.style_keywords
            .iter()
            .any(|s| s == style || s.contains(style))
    }

    /// Color match against explicit colors, then name and description
    pub fn has_color(&self, color: &str) -> bool {
        self.colors.iter().any(|c| c.contains(color))
            || self.name.contains(color)
            || self
                .description
                .as_deref()
                .map(|d| d.contains(color))
                .unwrap_or(false)
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.category
            .to_lowercase()
            .contains(&category.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_match_is_substring() {
        let product = Product::new("p1", "오버핏 반팔 티셔츠", "상의 > 반소매 티셔츠");
        assert!(product.in_category("상의"));
        assert!(!product.in_category("하의"));
    }

    #[test]
    fn test_color_match_falls_back_to_text() {
        let product = Product::new("p1", "블랙 후드", "상의").with_description("데일리 후드");
        assert!(product.has_color("블랙"));
        assert!(!product.has_color("화이트"));

        let tagged = Product::new("p2", "후드", "상의").with_colors(["화이트"]);
        assert!(tagged.has_color("화이트"));
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let product: Product =
            serde_json::from_str(r#"{"id":"1","name":"셔츠","category":"상의"}"#).unwrap();
        assert!(product.rating.is_none());
        assert_eq!(product.review_count, 0);
        assert!(product.embedding.is_empty());
    }
}
