//! logtriage Core
//!
//! Core types and error handling shared across logtriage components.
//!
//! This crate provides:
//! - Log records and the normalized classification result contract
//! - The per-record failure marker and routing decision trace
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    AttemptOutcome, ClassificationFailure, ClassificationResult, LogRecord, RecordOutcome,
    RoutingDecision, TierAttempt, UNCLASSIFIED_LABEL,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        ClassificationFailure, ClassificationResult, LogRecord, RecordOutcome, RoutingDecision,
    };
}
