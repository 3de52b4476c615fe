mod metrics;

use serde_json::json;
use uuid::Uuid;

pub use metrics::{MetricsCollector, MetricsEventSink, RecoveryMetrics};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BatchHeld {
        context_id: Uuid,
        rows: usize,
        held_rows: u64,
    },
    HolderCommitted {
        context_id: Uuid,
        held_rows: u64,
        reason: &'static str,
    },
    BatchDrained {
        context_id: Uuid,
        rows: usize,
    },
    HolderReset {
        context_id: Uuid,
        discarded_batches: usize,
        discarded_rows: u64,
    },
    RecoveryStarted {
        context_id: Uuid,
        attempt: u32,
        node_count: usize,
    },
    RecoverySucceeded {
        context_id: Uuid,
        attempt: u32,
        handler: &'static str,
    },
    RecoveryFailed {
        context_id: Uuid,
        attempt: u32,
        handler: Option<&'static str>,
        error: String,
    },
    RecoveryRejected {
        context_id: Uuid,
        reason: &'static str,
        error: String,
    },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::BatchHeld { .. } => "holder.batch_held",
            Event::HolderCommitted { .. } => "holder.committed",
            Event::BatchDrained { .. } => "holder.batch_drained",
            Event::HolderReset { .. } => "holder.reset",
            Event::RecoveryStarted { .. } => "recovery.started",
            Event::RecoverySucceeded { .. } => "recovery.succeeded",
            Event::RecoveryFailed { .. } => "recovery.failed",
            Event::RecoveryRejected { .. } => "recovery.rejected",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let ty = self.event_type();
        match self {
            Event::BatchHeld {
                context_id,
                rows,
                held_rows,
            } => {
                json!({ "type": ty, "context_id": context_id.to_string(), "rows": rows, "held_rows": held_rows })
            }
            Event::HolderCommitted {
                context_id,
                held_rows,
                reason,
            } => {
                json!({ "type": ty, "context_id": context_id.to_string(), "held_rows": held_rows, "reason": reason })
            }
            Event::BatchDrained { context_id, rows } => {
                json!({ "type": ty, "context_id": context_id.to_string(), "rows": rows })
            }
            Event::HolderReset {
                context_id,
                discarded_batches,
                discarded_rows,
            } => {
                json!({ "type": ty, "context_id": context_id.to_string(), "discarded_batches": discarded_batches, "discarded_rows": discarded_rows })
            }
            Event::RecoveryStarted {
                context_id,
                attempt,
                node_count,
            } => {
                json!({ "type": ty, "context_id": context_id.to_string(), "attempt": attempt, "node_count": node_count })
            }
            Event::RecoverySucceeded {
                context_id,
                attempt,
                handler,
            } => {
                json!({ "type": ty, "context_id": context_id.to_string(), "attempt": attempt, "handler": handler })
            }
            Event::RecoveryFailed {
                context_id,
                attempt,
                handler,
                error,
            } => {
                json!({ "type": ty, "context_id": context_id.to_string(), "attempt": attempt, "handler": handler, "error": error })
            }
            Event::RecoveryRejected {
                context_id,
                reason,
                error,
            } => {
                json!({ "type": ty, "context_id": context_id.to_string(), "reason": reason, "error": error })
            }
        }
    }
}

/// Receives orchestrator events. Called inline on the owner's thread, so sinks must not block
/// for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

#[derive(Default)]
pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for CompositeEventSink {
    fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

/// Writes one JSON object per event to stdout.
pub struct StdoutEventSink;

impl EventSink for StdoutEventSink {
    fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: Event) {}
}
