//! User feedback and the filter changes it implies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::filters::{FilterDelta, FilterKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Positive,
    Negative,
    Narrower,
    Broader,
    Behavioral,
}

impl FeedbackKind {
    /// Kinds that send the workflow back to retrieval
    pub fn triggers_retrieval(&self) -> bool {
        matches!(
            self,
            FeedbackKind::Negative | FeedbackKind::Narrower | FeedbackKind::Broader
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Positive => "positive",
            FeedbackKind::Negative => "negative",
            FeedbackKind::Narrower => "narrower",
            FeedbackKind::Broader => "broader",
            FeedbackKind::Behavioral => "behavioral",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Click or purchase style signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorSignal {
    Click,
    Purchase,
    Like,
}

impl BehaviorSignal {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "click" | "view" => Some(BehaviorSignal::Click),
            "purchase" | "buy" => Some(BehaviorSignal::Purchase),
            "like" | "save" => Some(BehaviorSignal::Like),
            _ => None,
        }
    }
}

/// Narrower-feedback flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refinement {
    Cheaper,
    DifferentStyle,
    BetterQuality,
    MoreTrendy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub filter_deltas: BTreeMap<FilterKey, FilterDelta>,
    /// Products to add to the exclusion set
    #[serde(default)]
    pub exclude_ids: Vec<String>,
    #[serde(default)]
    pub refinement: Option<Refinement>,
    #[serde(default)]
    pub signal: Option<BehaviorSignal>,
    #[serde(default)]
    pub product_id: Option<String>,
}

impl Feedback {
    pub fn new(kind: FeedbackKind) -> Self {
        Self {
            kind,
            filter_deltas: BTreeMap::new(),
            exclude_ids: Vec::new(),
            refinement: None,
            signal: None,
            product_id: None,
        }
    }

    pub fn set(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.filter_deltas.insert(key, FilterDelta::Set(value.into()));
        self
    }

    pub fn remove(mut self, key: FilterKey) -> Self {
        self.filter_deltas.insert(key, FilterDelta::Remove);
        self
    }

    pub fn exclude(mut self, id: impl Into<String>) -> Self {
        self.exclude_ids.push(id.into());
        self
    }

    pub fn with_refinement(mut self, refinement: Refinement) -> Self {
        self.refinement = Some(refinement);
        self
    }

    pub fn behavioral(signal: BehaviorSignal, product_id: Option<String>) -> Self {
        let mut feedback = Self::new(FeedbackKind::Behavioral);
        feedback.signal = Some(signal);
        feedback.product_id = product_id;
        feedback
    }
}

/// Feedback entry kept in session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub kind: FeedbackKind,
    #[serde(default)]
    pub signal: Option<BehaviorSignal>,
    #[serde(default)]
    pub product_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&Feedback> for FeedbackRecord {
    fn from(feedback: &Feedback) -> Self {
        Self {
            kind: feedback.kind,
            signal: feedback.signal,
            product_id: feedback.product_id.clone(),
            timestamp: Utc::now(),
        }
    }
}
