//! Centralized constants for the recommendation engine
//!
//! Load-bearing weights and thresholds live here so the retrieval engine,
//! the evaluator and the settings defaults agree on one value.

/// Hybrid score weights
pub mod scoring {
    pub const SIMILARITY_WEIGHT: f32 = 0.5;
    pub const RATING_WEIGHT: f32 = 0.3;
    pub const REVIEW_WEIGHT: f32 = 0.2;

    /// Ratings are normalized by this maximum
    pub const MAX_RATING: f32 = 5.0;

    /// `ln(review_count + 1)` is divided by this before clamping
    pub const REVIEW_LOG_DIVISOR: f32 = 10.0;

    /// Category browse: rating vs review share
    pub const BROWSE_RATING_WEIGHT: f32 = 0.6;
    pub const BROWSE_REVIEW_WEIGHT: f32 = 0.4;
}

/// Quality evaluator weights and gates
pub mod evaluation {
    pub const RELEVANCE_WEIGHT: f32 = 0.40;
    pub const DIVERSITY_WEIGHT: f32 = 0.25;
    pub const NOVELTY_WEIGHT: f32 = 0.20;
    pub const COVERAGE_WEIGHT: f32 = 0.15;

    /// `overall_score` at or above this is excellent
    pub const EXCELLENT_THRESHOLD: f32 = 0.8;

    /// Quality gate: below this the workflow retries
    pub const GOOD_THRESHOLD: f32 = 0.6;

    /// Axes below this produce a suggestion
    pub const SUGGESTION_THRESHOLD: f32 = 0.5;

    pub const HISTORY_CAPACITY: usize = 1000;
}

/// Retrieval defaults
pub mod retrieval {
    pub const DEFAULT_TOP_K: usize = 5;
    pub const MAX_TOP_K: usize = 50;

    /// Neighbours fetched per requested result before filtering
    pub const OVERFETCH_FACTOR: usize = 3;
    pub const MIN_OVERFETCH_FACTOR: usize = 3;

    pub const EMBEDDING_DIM: usize = 384;

    /// Category browse default rating floor
    pub const BROWSE_MIN_RATING: f32 = 4.0;

    pub const SUGGESTION_KEYWORDS: &[&str] = &[
        "베이직", "오버핏", "스트릿", "꾸안꾸", "트렌디", "반팔", "티셔츠", "셔츠", "맨투맨", "후드",
    ];
}

/// Session limits
pub mod session {
    /// Chat messages kept per session; older ones are dropped first
    pub const HISTORY_CAPACITY: usize = 200;
}

/// Workflow defaults
pub mod workflow {
    pub const MAX_RETRIES: u32 = 2;

    /// Provider call timeout (ms)
    pub const PROVIDER_TIMEOUT_MS: u64 = 10_000;

    pub const FALLBACK_APOLOGY: &str =
        "죄송합니다. 요청을 처리하는 중 문제가 발생했어요. 잠시 후 다시 시도해 주세요.";
}

/// Price tier ceilings (KRW)
pub mod pricing {
    pub const BUDGET_CEILING: u32 = 30_000;
    pub const MID_CEILING: u32 = 70_000;
}

/// Service endpoints
pub mod endpoints {
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";
}
