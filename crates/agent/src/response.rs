//! Final message rendering
//!
//! The response generator supplies the lead-in; the recommendation list is
//! always rendered here so links and ratings never depend on a model.

use std::fmt::Write;

use stylist_config::constants::workflow::FALLBACK_APOLOGY;
use stylist_core::{ErrorInfo, Recommendation};

/// User-facing text for a run that carries an error
pub fn apology(error: &ErrorInfo) -> String {
    tracing::debug!(kind = ?error.kind, step = %error.step, "Rendering apology");
    FALLBACK_APOLOGY.to_string()
}

/// Lead-in followed by the numbered recommendation list
pub fn render(lead_in: &str, recommendations: &[Recommendation]) -> String {
    let mut out = lead_in.trim().to_string();
    if recommendations.is_empty() {
        return out;
    }

    out.push_str("\n\n");
    for (i, rec) in recommendations.iter().enumerate() {
        let product = &rec.product;
        let _ = write!(out, "{}. **{}**", i + 1, product.name);
        if let Some(rating) = product.rating {
            let _ = write!(out, " ⭐ {:.1} ({}개 리뷰)", rating, product.review_count);
        }
        if let Some(price) = product.price {
            let _ = write!(out, " · {}", format_price(price));
        }
        out.push('\n');
        if !rec.reason.is_empty() {
            let _ = writeln!(out, "   {}", rec.reason);
        }
        if !product.url.is_empty() {
            let _ = writeln!(out, "   {}", product.url);
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// "29,000원"
fn format_price(price: u32) -> String {
    let digits = price.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}원", grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylist_core::{Error, Product, WorkflowStep};

    fn rec(name: &str, price: Option<u32>) -> Recommendation {
        let mut product = Product::new(name, name, "상의")
            .with_rating(4.5, 120)
            .with_url(format!("https://shop.example/{}", name));
        product.price = price;
        Recommendation {
            product,
            similarity: 0.8,
            rating_score: 0.9,
            review_score: 0.48,
            final_score: 0.77,
            reason: "요청과 잘 맞아요".to_string(),
        }
    }

    #[test]
    fn test_render_numbered_list() {
        let text = render("😊 골라봤어요!", &[rec("a", Some(29_000)), rec("b", None)]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "😊 골라봤어요!");
        assert_eq!(lines[2], "1. **a** ⭐ 4.5 (120개 리뷰) · 29,000원");
        assert_eq!(lines[3], "   요청과 잘 맞아요");
        assert_eq!(lines[4], "   https://shop.example/a");
        assert!(lines[5].starts_with("2. **b**"));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_render_without_results() {
        assert_eq!(render("  없어요  ", &[]), "없어요");
    }

    #[test]
    fn test_apology_and_price_format() {
        let info = ErrorInfo::from_error(&Error::Provider("down".into()), WorkflowStep::Retrieve);
        assert_eq!(apology(&info), FALLBACK_APOLOGY);
        assert_eq!(format_price(1_250_000), "1,250,000원");
        assert_eq!(format_price(900), "900원");
    }
}
