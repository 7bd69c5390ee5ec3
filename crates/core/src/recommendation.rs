//! Ranked recommendations and their quality evaluation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::product::Product;

/// A scored product with an explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product: Product,
    pub similarity: f32,
    pub rating_score: f32,
    pub review_score: f32,
    pub final_score: f32,
    pub reason: String,
}

/// Step function of the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excellent,
    Good,
    NeedsImprovement,
}

impl QualityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Excellent => "excellent",
            QualityLevel::Good => "good",
            QualityLevel::NeedsImprovement => "needs_improvement",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter change a suggestion asks the next retrieval to make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Pull more nearest neighbours before filtering
    WidenCandidatePool,
    /// Drop one soft filter (color, style, min_rating)
    RelaxSoftFilter,
    /// Exclude the ids that were just shown
    ExcludeShown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub relevance: f32,
    pub diversity: f32,
    pub novelty: f32,
    pub coverage: f32,
    pub overall_score: f32,
    pub quality_level: QualityLevel,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
}

impl EvaluationResult {
    pub fn needs_improvement(&self) -> bool {
        self.quality_level == QualityLevel::NeedsImprovement
    }
}
