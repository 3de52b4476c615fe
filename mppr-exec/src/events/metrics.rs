use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::events::{Event, EventSink};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryMetrics {
    pub batches_held: usize,
    pub rows_held: u64,
    pub batches_drained: usize,
    pub rows_drained: u64,
    pub holder_commits: usize,
    pub holder_resets: usize,
    pub recovery_attempts: usize,
    pub recovery_succeeded: usize,
    pub recovery_failed: usize,
    pub recovery_rejected: usize,
}

impl RecoveryMetrics {
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::BatchHeld { rows, .. } => {
                self.batches_held += 1;
                self.rows_held += *rows as u64;
            }
            Event::HolderCommitted { .. } => self.holder_commits += 1,
            Event::BatchDrained { rows, .. } => {
                self.batches_drained += 1;
                self.rows_drained += *rows as u64;
            }
            Event::HolderReset { .. } => self.holder_resets += 1,
            Event::RecoveryStarted { .. } => self.recovery_attempts += 1,
            Event::RecoverySucceeded { .. } => self.recovery_succeeded += 1,
            Event::RecoveryFailed { .. } => self.recovery_failed += 1,
            Event::RecoveryRejected { .. } => self.recovery_rejected += 1,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "holder": {
                "batches_held": self.batches_held,
                "rows_held": self.rows_held,
                "batches_drained": self.batches_drained,
                "rows_drained": self.rows_drained,
                "commits": self.holder_commits,
                "resets": self.holder_resets,
            },
            "recovery": {
                "attempts": self.recovery_attempts,
                "succeeded": self.recovery_succeeded,
                "failed": self.recovery_failed,
                "rejected": self.recovery_rejected,
            },
        })
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: Mutex<RecoveryMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: &Event) {
        self.lock().record(event);
    }

    pub fn get_metrics(&self) -> RecoveryMetrics {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, RecoveryMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Updates a [`MetricsCollector`] and forwards every event to `base`.
pub struct MetricsEventSink {
    collector: Arc<MetricsCollector>,
    base: Arc<dyn EventSink>,
}

impl MetricsEventSink {
    pub fn new(collector: Arc<MetricsCollector>, base: Arc<dyn EventSink>) -> Self {
        Self { collector, base }
    }
}

impl EventSink for MetricsEventSink {
    fn emit(&self, event: Event) {
        self.collector.record(&event);
        self.base.emit(event);
    }
}
