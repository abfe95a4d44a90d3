//! logtriage Telemetry
//!
//! Routing metrics for the classification cascade: how many records each tier
//! resolved, how many fell through to `Unclassified`, how many failed, and how
//! long the tiers took. Counters are kept locally for batch summaries and
//! mirrored to the `metrics` facade for whatever recorder the host installs.

pub mod metrics;

pub use crate::metrics::{describe_metrics, MetricsSnapshot, RoutingMetrics};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::{MetricsSnapshot, RoutingMetrics};
}
