//! Metrics collection and reporting

use logtriage_core::{AttemptOutcome, RecordOutcome, RoutingDecision};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

const RECORDS_TOTAL: &str = "logtriage_records_total";
const TIER_ATTEMPTS_TOTAL: &str = "logtriage_tier_attempts_total";
const TIER_LATENCY_US: &str = "logtriage_tier_latency_us";
const RECORD_LATENCY_US: &str = "logtriage_record_latency_us";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    ::metrics::describe_counter!(
        RECORDS_TOTAL,
        "Total number of log records routed, by outcome and resolving tier"
    );
    ::metrics::describe_counter!(
        TIER_ATTEMPTS_TOTAL,
        "Total number of tier invocations, by tier and attempt outcome"
    );
    ::metrics::describe_histogram!(
        TIER_LATENCY_US,
        ::metrics::Unit::Microseconds,
        "Per-tier classification latency in microseconds"
    );
    ::metrics::describe_histogram!(
        RECORD_LATENCY_US,
        ::metrics::Unit::Microseconds,
        "End-to-end routing latency per record in microseconds"
    );
}

/// Metrics collector for the routing cascade
#[derive(Clone)]
pub struct RoutingMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    total_records: AtomicU64,
    pattern_resolved: AtomicU64,
    semantic_resolved: AtomicU64,
    remote_resolved: AtomicU64,
    other_resolved: AtomicU64,
    unclassified: AtomicU64,
    failures: AtomicU64,
    tier_attempts: AtomicU64,
    total_latency_us: AtomicU64,
}

impl RoutingMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record the outcome of routing one record
    pub fn record(&self, decision: &RoutingDecision, outcome: &RecordOutcome) {
        let inner = &self.inner;
        inner.total_records.fetch_add(1, Ordering::Relaxed);
        inner
            .tier_attempts
            .fetch_add(decision.attempts.len() as u64, Ordering::Relaxed);

        let latency_us = decision.total_latency_us();
        inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
        ::metrics::histogram!(RECORD_LATENCY_US).record(latency_us as f64);

        for attempt in &decision.attempts {
            ::metrics::counter!(
                TIER_ATTEMPTS_TOTAL,
                "tier" => attempt.tier.clone(),
                "outcome" => attempt_label(&attempt.outcome)
            )
            .increment(1);
            ::metrics::histogram!(TIER_LATENCY_US, "tier" => attempt.tier.clone())
                .record(attempt.latency_us as f64);
        }

        let (kind, tier) = match outcome {
            Err(failure) => {
                inner.failures.fetch_add(1, Ordering::Relaxed);
                ("failed", failure.tier.clone())
            }
            Ok(result) if result.is_unclassified() => {
                inner.unclassified.fetch_add(1, Ordering::Relaxed);
                ("unclassified", decision.resolved_by.clone().unwrap_or_default())
            }
            Ok(_) => {
                let tier = decision.resolved_by.clone().unwrap_or_default();
                self.resolved_counter(&tier).fetch_add(1, Ordering::Relaxed);
                ("classified", tier)
            }
        };

        debug!(
            route = %decision.route,
            outcome = kind,
            tier = %tier,
            latency_us,
            "Recorded routing outcome"
        );
        ::metrics::counter!(RECORDS_TOTAL, "outcome" => kind, "tier" => tier).increment(1);
    }

    fn resolved_counter(&self, tier: &str) -> &AtomicU64 {
        match tier {
            "pattern" => &self.inner.pattern_resolved,
            "semantic" => &self.inner.semantic_resolved,
            "remote" => &self.inner.remote_resolved,
            _ => &self.inner.other_resolved,
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = &self.inner;
        MetricsSnapshot {
            total_records: inner.total_records.load(Ordering::Relaxed),
            pattern_resolved: inner.pattern_resolved.load(Ordering::Relaxed),
            semantic_resolved: inner.semantic_resolved.load(Ordering::Relaxed),
            remote_resolved: inner.remote_resolved.load(Ordering::Relaxed),
            other_resolved: inner.other_resolved.load(Ordering::Relaxed),
            unclassified: inner.unclassified.load(Ordering::Relaxed),
            failures: inner.failures.load(Ordering::Relaxed),
            tier_attempts: inner.tier_attempts.load(Ordering::Relaxed),
            total_latency_us: inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for RoutingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn attempt_label(outcome: &AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Accepted { .. } => "accepted",
        AttemptOutcome::BelowThreshold { .. } => "below_threshold",
        AttemptOutcome::NoMatch => "no_match",
        AttemptOutcome::Failed { .. } => "failed",
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_records: u64,
    pub pattern_resolved: u64,
    pub semantic_resolved: u64,
    pub remote_resolved: u64,
    pub other_resolved: u64,
    pub unclassified: u64,
    pub failures: u64,
    pub tier_attempts: u64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Calculate average tier latency per record
    pub fn avg_latency_us(&self) -> u64 {
        if self.total_records == 0 {
            0
        } else {
            self.total_latency_us / self.total_records
        }
    }

    /// Average number of tiers invoked per record
    pub fn avg_tiers_per_record(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.tier_attempts as f64 / self.total_records as f64
        }
    }

    /// Share of records that ended in a failure marker
    pub fn failure_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.failures as f64 / self.total_records as f64
        }
    }
}
