//! Classifier trait and common types

use async_trait::async_trait;
use logtriage_core::Result;

/// Trait for every tier in the cascade
///
/// `Ok(None)` is the ordinary "no match" answer and drives escalation.
/// `Err` is reserved for genuine failures (model error, transport error,
/// malformed response) and is never treated as a miss.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text
    async fn classify(&self, text: &str) -> Result<Option<TierMatch>>;

    /// Get the classifier name; routes refer to tiers by this name
    fn name(&self) -> &str;

    /// Get the tier (cost category)
    fn tier(&self) -> ClassifierTier;
}

/// A label proposed by one tier
#[derive(Debug, Clone)]
pub struct TierMatch {
    /// Classification label
    pub label: String,

    /// Confidence score (0.0-1.0)
    pub score: f32,

    /// Additional metadata
    pub metadata: ClassificationMetadata,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl TierMatch {
    /// Create a new tier match
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
            metadata: ClassificationMetadata::default(),
            latency_us: 0,
        }
    }

    /// Check if score meets threshold
    pub fn meets_threshold(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// Metadata about classification
#[derive(Debug, Clone, Default)]
pub struct ClassificationMetadata {
    /// Matched spans (for pattern-based classifiers)
    pub spans: Vec<(usize, usize)>,

    /// Index of the rule that fired (pattern tier)
    pub rule_index: Option<usize>,

    /// Model name or artifact version
    pub model: Option<String>,

    /// Per-label scores (semantic tier)
    pub all_scores: Option<Vec<(String, f32)>>,
}

/// Classifier cost tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierTier {
    /// Deterministic rule lookup, never blocks
    Pattern,
    /// Embedding similarity, CPU-bound
    Semantic,
    /// External service call, network-bound and unbounded without a timeout
    Remote,
}

impl ClassifierTier {
    /// Get the expected latency budget for this tier in microseconds
    pub fn latency_budget_us(&self) -> u64 {
        match self {
            Self::Pattern => 2_000,
            Self::Semantic => 50_000,
            Self::Remote => 10_000_000,
        }
    }

    /// Whether the tier's own score is meaningful, as opposed to a fixed convention
    pub fn reports_score(&self) -> bool {
        matches!(self, Self::Semantic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Semantic => "semantic",
            Self::Remote => "remote",
        }
    }
}

impl std::fmt::Display for ClassifierTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
