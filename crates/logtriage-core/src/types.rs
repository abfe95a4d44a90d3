//! Core types for logtriage

use serde::{Deserialize, Serialize};

/// Label reported when no tier produced a confident classification
pub const UNCLASSIFIED_LABEL: &str = "Unclassified";

/// A single log line awaiting classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Originating system
    pub source: String,

    /// Raw log text, possibly empty
    pub message: String,
}

impl LogRecord {
    /// Create a new log record
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Final classification of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub source: String,
    pub message: String,

    /// Category label; open-ended, any tier may introduce a new one
    pub label: String,

    /// Confidence in `[0, 1]`
    pub confidence: f32,
}

impl ClassificationResult {
    /// Create a result for `record`, clamping confidence into `[0, 1]`
    pub fn new(record: &LogRecord, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            source: record.source.clone(),
            message: record.message.clone(),
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The terminal "nothing matched" outcome
    pub fn unclassified(record: &LogRecord) -> Self {
        Self::new(record, UNCLASSIFIED_LABEL, 0.0)
    }

    /// Whether this is the unclassified sentinel
    pub fn is_unclassified(&self) -> bool {
        self.label == UNCLASSIFIED_LABEL
    }
}

/// Per-record failure marker: a tier errored, timed out, or answered garbage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationFailure {
    pub source: String,
    pub message: String,

    /// Name of the tier that failed
    pub tier: String,

    /// Underlying reason
    pub cause: String,
}

impl ClassificationFailure {
    /// Create a failure marker for `record`
    pub fn new(record: &LogRecord, tier: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            source: record.source.clone(),
            message: record.message.clone(),
            tier: tier.into(),
            cause: cause.into(),
        }
    }
}

impl std::fmt::Display for ClassificationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} tier failed: {}", self.tier, self.cause)
    }
}

// `source` is the record's originating system, not an underlying error.
impl std::error::Error for ClassificationFailure {}

/// Outcome of routing a single record
pub type RecordOutcome = std::result::Result<ClassificationResult, ClassificationFailure>;

/// What happened when a record was offered to one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The tier produced an accepted label
    Accepted { label: String, confidence: f32 },

    /// The tier produced a label below its acceptance threshold
    BelowThreshold { label: String, confidence: f32 },

    /// The tier had nothing to say
    NoMatch,

    /// The tier errored or timed out
    Failed { cause: String },
}

/// One tier invocation within a routing decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAttempt {
    pub tier: String,
    pub outcome: AttemptOutcome,
    pub latency_us: u64,
}

/// Trace of the tiers attempted for one record
///
/// Observability only; never consulted for correctness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Name of the route the routing policy selected
    pub route: String,

    /// Attempts in invocation order
    pub attempts: Vec<TierAttempt>,

    /// Tier whose output became the result, `None` when unclassified or failed
    pub resolved_by: Option<String>,
}

impl RoutingDecision {
    /// Start a decision trace for the named route
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..Default::default()
        }
    }

    /// Record an attempt
    pub fn push(&mut self, tier: impl Into<String>, outcome: AttemptOutcome, latency_us: u64) {
        self.attempts.push(TierAttempt {
            tier: tier.into(),
            outcome,
            latency_us,
        });
    }

    /// Names of the tiers invoked, in order
    pub fn tiers_attempted(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.tier.as_str()).collect()
    }

    /// Total time spent inside tiers
    pub fn total_latency_us(&self) -> u64 {
        self.attempts.iter().map(|a| a.latency_us).sum()
    }
}
