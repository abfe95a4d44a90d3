//! Batch classification
//!
//! Runs a sequence of records through a shared [`ClassificationRouter`] with
//! bounded concurrency. Outcomes come back in input order, one per record, and
//! a failing record never affects its neighbours.

use crate::router::ClassificationRouter;
use futures::stream::{self, StreamExt};
use logtriage_core::{ClassificationFailure, LogRecord, RecordOutcome};
use logtriage_telemetry::RoutingMetrics;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Tier name reported when the routing task itself dies
const RUNNER_TIER: &str = "runner";

/// Aggregate counts for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,

    /// Records with a real label
    pub classified: usize,

    pub unclassified: usize,
    pub failed: usize,

    /// Records resolved per tier name
    pub resolved_by: BTreeMap<String, usize>,

    pub elapsed_ms: u64,
}

/// Output of [`BatchRunner::run_batch`]
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,

    /// One outcome per input record, in input order
    pub outcomes: Vec<RecordOutcome>,

    pub summary: BatchSummary,
}

/// Applies the router to every record in a batch
pub struct BatchRunner {
    router: Arc<ClassificationRouter>,
    concurrency: usize,
    metrics: RoutingMetrics,
}

impl BatchRunner {
    /// Runner with one in-flight record per CPU
    pub fn new(router: Arc<ClassificationRouter>) -> Self {
        Self {
            router,
            concurrency: num_cpus::get().max(1),
            metrics: RoutingMetrics::new(),
        }
    }

    /// Maximum records in flight; 1 processes strictly sequentially
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Share a metrics collector with the caller
    pub fn with_metrics(mut self, metrics: RoutingMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &RoutingMetrics {
        &self.metrics
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Classify every record, preserving order
    pub async fn run_batch(&self, records: Vec<LogRecord>) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", %batch_id, records = records.len());

        async move {
            let start = Instant::now();

            let mut indexed: Vec<(usize, RecordOutcome, Option<String>)> =
                stream::iter(records.into_iter().enumerate())
                    .map(|(index, record)| self.spawn_record(index, record))
                    .buffer_unordered(self.concurrency)
                    .collect()
                    .await;
            indexed.sort_unstable_by_key(|(index, _, _)| *index);

            let mut summary = BatchSummary {
                total: indexed.len(),
                ..Default::default()
            };
            let mut outcomes = Vec::with_capacity(indexed.len());
            for (_, outcome, resolved_by) in indexed {
                match &outcome {
                    Ok(result) if result.is_unclassified() => summary.unclassified += 1,
                    Ok(_) => summary.classified += 1,
                    Err(_) => summary.failed += 1,
                }
                if let (Ok(_), Some(tier)) = (&outcome, resolved_by) {
                    *summary.resolved_by.entry(tier).or_default() += 1;
                }
                outcomes.push(outcome);
            }
            summary.elapsed_ms = start.elapsed().as_millis() as u64;

            info!(
                total = summary.total,
                classified = summary.classified,
                unclassified = summary.unclassified,
                failed = summary.failed,
                elapsed_ms = summary.elapsed_ms,
                "Batch complete"
            );

            BatchReport {
                batch_id,
                outcomes,
                summary,
            }
        }
        .instrument(span)
        .await
    }

    /// Route one record on its own task so a panic stays contained
    async fn spawn_record(
        &self,
        index: usize,
        record: LogRecord,
    ) -> (usize, RecordOutcome, Option<String>) {
        let router = Arc::clone(&self.router);
        let metrics = self.metrics.clone();
        let fallback = record.clone();

        let handle = tokio::spawn(
            async move {
                let (outcome, decision) = router.route_record(&record).await;
                metrics.record(&decision, &outcome);
                (outcome, decision.resolved_by)
            }
            .in_current_span(),
        );

        match handle.await {
            Ok((outcome, resolved_by)) => (index, outcome, resolved_by),
            Err(e) => {
                warn!(index, error = %e, "Routing task aborted");
                let failure = ClassificationFailure::new(&fallback, RUNNER_TIER, e.to_string());
                (index, Err(failure), None)
            }
        }
    }
}
