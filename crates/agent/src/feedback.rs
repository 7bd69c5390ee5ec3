//! Feedback interpretation
//!
//! Turns a reaction to the previous recommendations into a [`Feedback`]
//! value: a kind plus the filter deltas and exclusions it implies. The
//! interpreter never touches session state itself; [`apply_feedback`] folds
//! the result into a filter set.

use std::collections::BTreeMap;

use stylist_core::{
    BehaviorSignal, Feedback, FeedbackKind, FilterKey, PriceTiers, Refinement, SearchFilters,
};
use stylist_text_processing::cues;
use stylist_text_processing::lexicon::{normalize, Lexicon};

use crate::AgentError;

/// Rating floor set by a "better quality" request
pub const BETTER_QUALITY_MIN_RATING: f32 = 4.5;

/// Style set by a "more trendy" request
pub const TRENDY_STYLE: &str = "트렌디";

/// Relaxation order for negative feedback when match counts are unknown
const NEGATIVE_FALLBACK_ORDER: &[FilterKey] = &[
    FilterKey::Color,
    FilterKey::Style,
    FilterKey::MinRating,
    FilterKey::PriceRange,
    FilterKey::MaxPrice,
    FilterKey::Category,
];

/// Session facts some policies need
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackContext<'a> {
    /// Products each active filter lets through in the current index
    pub match_counts: Option<&'a BTreeMap<FilterKey, usize>>,
    /// Best product of the previous recommendation list
    pub top_ranked_id: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackInterpreter {
    lexicon: Lexicon,
    tiers: PriceTiers,
}

impl FeedbackInterpreter {
    pub fn new(tiers: PriceTiers) -> Self {
        Self {
            lexicon: Lexicon::default(),
            tiers,
        }
    }

    pub fn tiers(&self) -> &PriceTiers {
        &self.tiers
    }

    /// Interpret feedback with no index or history information
    pub fn interpret(&self, text: &str, current: &SearchFilters) -> Feedback {
        self.interpret_with(text, current, &FeedbackContext::default())
    }

    pub fn interpret_with(
        &self,
        text: &str,
        current: &SearchFilters,
        context: &FeedbackContext<'_>,
    ) -> Feedback {
        let text = normalize(text);
        let named = self.lexicon.extract_filters(&text);

        let kind = cues::detect_feedback_kind(&text).unwrap_or(if named.active_keys().is_empty() {
            FeedbackKind::Positive
        } else {
            FeedbackKind::Narrower
        });

        let feedback = match kind {
            FeedbackKind::Narrower => self.narrower(&text, current, &named),
            FeedbackKind::Broader => self.broader(current),
            FeedbackKind::Negative => self.negative(current, context),
            FeedbackKind::Behavioral => Feedback::behavioral(
                cues::detect_signal(&text),
                context.top_ranked_id.map(str::to_string),
            ),
            FeedbackKind::Positive => Feedback::new(FeedbackKind::Positive),
        };

        tracing::debug!(
            kind = %feedback.kind,
            refinement = ?feedback.refinement,
            deltas = feedback.filter_deltas.len(),
            excluded = feedback.exclude_ids.len(),
            "Feedback interpreted"
        );

        feedback
    }

    /// Explicit behavioral signal reported outside the conversation
    pub fn behavioral(&self, signal: &str, product_id: &str) -> Result<Feedback, AgentError> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(AgentError::Feedback("product_id must not be empty".to_string()));
        }
        let signal = BehaviorSignal::parse(signal)
            .ok_or_else(|| AgentError::Feedback(format!("unknown signal: {}", signal)))?;
        Ok(Feedback::behavioral(signal, Some(product_id.to_string())))
    }

    fn narrower(&self, text: &str, current: &SearchFilters, named: &SearchFilters) -> Feedback {
        let mut feedback = Feedback::new(FeedbackKind::Narrower);

        if let Some(refinement) = cues::detect_refinement(text) {
            feedback = feedback.with_refinement(refinement);
            feedback = match refinement {
                Refinement::Cheaper => {
                    let ceiling = self
                        .tiers
                        .lower_ceiling(current.price_ceiling(&self.tiers), current.price_range);
                    feedback
                        .set(FilterKey::MaxPrice, ceiling.to_string())
                        .remove(FilterKey::PriceRange)
                },
                Refinement::DifferentStyle => {
                    let current_style = current.style.as_deref();
                    let style = self
                        .lexicon
                        .match_style(text)
                        .filter(|s| Some(*s) != current_style)
                        .or_else(|| self.lexicon.style_after(current_style));
                    match style {
                        Some(style) => feedback.set(FilterKey::Style, style),
                        None => feedback.remove(FilterKey::Style),
                    }
                },
                Refinement::BetterQuality => {
                    feedback.set(FilterKey::MinRating, BETTER_QUALITY_MIN_RATING.to_string())
                },
                Refinement::MoreTrendy => feedback.set(FilterKey::Style, TRENDY_STYLE),
            };
        }

        merge_named(feedback, named)
    }

    fn broader(&self, current: &SearchFilters) -> Feedback {
        let feedback = Feedback::new(FeedbackKind::Broader);

        if current.has_price_bound() {
            let relaxed = current
                .price_ceiling(&self.tiers)
                .and_then(|c| self.tiers.higher_ceiling(c));
            let feedback = feedback.remove(FilterKey::PriceRange);
            return match relaxed {
                Some(ceiling) => feedback.set(FilterKey::MaxPrice, ceiling.to_string()),
                None => feedback.remove(FilterKey::MaxPrice),
            };
        }

        if current.category.is_some() {
            feedback.remove(FilterKey::Category)
        } else {
            feedback
        }
    }

    fn negative(&self, current: &SearchFilters, context: &FeedbackContext<'_>) -> Feedback {
        let mut feedback = Feedback::new(FeedbackKind::Negative);

        if let Some(key) = least_selective(current, context.match_counts) {
            feedback = if key.is_price() {
                feedback
                    .remove(FilterKey::PriceRange)
                    .remove(FilterKey::MaxPrice)
            } else {
                feedback.remove(key)
            };
        }

        if let Some(id) = context.top_ranked_id {
            feedback = feedback.exclude(id);
        }
        feedback
    }
}

/// Attributes the user named alongside the feedback. A refinement's own
/// choice wins, except an explicit price ceiling which replaces it.
fn merge_named(mut feedback: Feedback, named: &SearchFilters) -> Feedback {
    if let Some(max_price) = named.max_price {
        feedback = feedback
            .set(FilterKey::MaxPrice, max_price.to_string())
            .remove(FilterKey::PriceRange);
    } else if let Some(tier) = named.price_range {
        if !feedback.filter_deltas.keys().any(FilterKey::is_price) {
            feedback = feedback.set(FilterKey::PriceRange, tier.label());
        }
    }

    let attributes = [
        (FilterKey::Category, named.category.as_deref()),
        (FilterKey::Style, named.style.as_deref()),
        (FilterKey::Color, named.color.as_deref()),
    ];
    for (key, value) in attributes {
        if let Some(value) = value {
            if !feedback.filter_deltas.contains_key(&key) {
                feedback = feedback.set(key, value);
            }
        }
    }
    feedback
}

/// Active filter matched by the most products, ties and unknown counts
/// resolved by the fallback order
fn least_selective(
    filters: &SearchFilters,
    counts: Option<&BTreeMap<FilterKey, usize>>,
) -> Option<FilterKey> {
    let active = filters.active_keys();
    let ordered = NEGATIVE_FALLBACK_ORDER
        .iter()
        .copied()
        .filter(|k| active.contains(k));

    match counts {
        Some(counts) => {
            let mut best: Option<(FilterKey, usize)> = None;
            for key in ordered {
                let count = counts.get(&key).copied().unwrap_or(0);
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((key, count));
                }
            }
            best.map(|(key, _)| key)
        },
        None => ordered.into_iter().next(),
    }
}

/// Filters after applying `feedback` to `filters`
pub fn apply_feedback(
    feedback: &Feedback,
    filters: &SearchFilters,
) -> stylist_core::Result<SearchFilters> {
    let mut next = filters.clone();
    next.merge_deltas(&feedback.filter_deltas)?;
    next.excluded_ids.extend(feedback.exclude_ids.iter().cloned());
    Ok(next)
}
