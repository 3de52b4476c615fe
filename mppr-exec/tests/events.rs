use std::sync::{Arc, Mutex};

use mppr_core::{RecoveryConfig, SizedBatch};
use mppr_exec::events::{
    CompositeEventSink, Event, EventSink, MetricsCollector, MetricsEventSink, NoOpEventSink,
    RecoveryMetrics,
};
use mppr_exec::recovery::{RecoveryOrchestrator, RecoveryRequest};
use mppr_exec::topology::FixedTopologyFetcher;
use uuid::Uuid;

#[derive(Default)]
struct CapturingSink {
    events: Mutex<Vec<Event>>,
}

impl EventSink for CapturingSink {
    fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl CapturingSink {
    fn types(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(Event::event_type).collect()
    }
}

fn orchestrator(sink: Arc<dyn EventSink>) -> RecoveryOrchestrator<SizedBatch> {
    let cfg = RecoveryConfig {
        enable: true,
        use_auto_scaler: true,
        holder_capacity: 20,
        max_recovery_count: 1,
        ..Default::default()
    };
    RecoveryOrchestrator::new(
        &cfg,
        Arc::new(FixedTopologyFetcher::new(vec!["n1".to_string()])),
        None,
    )
    .with_event_sink(sink)
}

#[test]
fn holder_lifecycle_emits_events_in_order() {
    let sink = Arc::new(CapturingSink::default());
    let mut orch = orchestrator(sink.clone());

    orch.hold_result(SizedBatch::new(0, 15, 1)).unwrap();
    orch.hold_result(SizedBatch::new(1, 5, 1)).unwrap();
    orch.pop_front_batch().unwrap();
    orch.reset_holder();
    orch.hold_result(SizedBatch::new(2, 1, 1)).unwrap();
    orch.pop_front_batch().unwrap();

    assert_eq!(
        sink.types(),
        vec![
            "holder.batch_held",
            "holder.batch_held",
            "holder.committed",
            "holder.batch_drained",
            "holder.reset",
            "holder.batch_held",
            "holder.committed",
            "holder.batch_drained",
        ]
    );
    let events = sink.events.lock().unwrap();
    assert!(matches!(events[2], Event::HolderCommitted { reason: "capacity", held_rows: 20, .. }));
    assert!(matches!(events[4], Event::HolderReset { discarded_batches: 1, discarded_rows: 20, .. }));
    assert!(matches!(events[6], Event::HolderCommitted { reason: "drain", .. }));
}

#[test]
fn every_recovery_call_ends_with_one_terminal_event() {
    let sink = Arc::new(CapturingSink::default());
    let mut orch = orchestrator(sink.clone());

    orch.recovery(Some(&RecoveryRequest::new("Memory limit exceeded", 2))).unwrap();
    orch.recovery(Some(&RecoveryRequest::new("Memory limit exceeded", 2))).unwrap_err();

    assert_eq!(
        sink.types(),
        vec!["recovery.started", "recovery.succeeded", "recovery.rejected"]
    );
    let events = sink.events.lock().unwrap();
    match &events[2] {
        Event::RecoveryRejected { reason, error, .. } => {
            assert_eq!(*reason, "budget_exceeded");
            assert!(error.contains("cur: 1, max: 1"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[test]
fn metrics_sink_counts_and_forwards() {
    let collector = Arc::new(MetricsCollector::new());
    let capture = Arc::new(CapturingSink::default());
    let sink = Arc::new(MetricsEventSink::new(collector.clone(), capture.clone()));
    let mut orch = orchestrator(sink);

    orch.hold_result(SizedBatch::new(0, 4, 1)).unwrap();
    orch.pop_front_batch().unwrap();
    orch.recovery(Some(&RecoveryRequest::new("connection reset", 2))).unwrap_err();
    orch.recovery(None).unwrap_err();

    let m = collector.get_metrics();
    assert_eq!(m.batches_held, 1);
    assert_eq!(m.rows_held, 4);
    assert_eq!(m.batches_drained, 1);
    assert_eq!(m.rows_drained, 4);
    assert_eq!(m.holder_commits, 1);
    assert_eq!(m.recovery_attempts, 1);
    assert_eq!(m.recovery_failed, 1);
    assert_eq!(m.recovery_rejected, 1);
    assert_eq!(m.recovery_succeeded, 0);
    assert_eq!(capture.types().len(), 6);
}

#[test]
fn composite_sink_fans_out() {
    let a = Arc::new(CapturingSink::default());
    let b = Arc::new(CapturingSink::default());
    let mut composite = CompositeEventSink::new();
    composite.add(Box::new(ArcSink(a.clone())));
    composite.add(Box::new(ArcSink(b.clone())));
    composite.add(Box::new(NoOpEventSink));

    composite.emit(Event::BatchDrained {
        context_id: Uuid::nil(),
        rows: 3,
    });
    assert_eq!(a.types(), vec!["holder.batch_drained"]);
    assert_eq!(b.types(), vec!["holder.batch_drained"]);
}

struct ArcSink(Arc<CapturingSink>);

impl EventSink for ArcSink {
    fn emit(&self, event: Event) {
        self.0.emit(event);
    }
}

#[test]
fn event_json_carries_type_and_context() {
    let id = Uuid::new_v4();
    let json = Event::RecoveryFailed {
        context_id: id,
        attempt: 2,
        handler: Some("memory_limit"),
        error: "boom".to_string(),
    }
    .to_json();
    assert_eq!(json["type"], "recovery.failed");
    assert_eq!(json["context_id"], id.to_string());
    assert_eq!(json["attempt"], 2);
    assert_eq!(json["handler"], "memory_limit");
}

#[test]
fn metrics_to_json() {
    let mut m = RecoveryMetrics::default();
    m.record(&Event::RecoveryStarted {
        context_id: Uuid::nil(),
        attempt: 1,
        node_count: 2,
    });
    m.record(&Event::RecoverySucceeded {
        context_id: Uuid::nil(),
        attempt: 1,
        handler: "memory_limit",
    });
    let json = m.to_json();
    assert_eq!(json["recovery"]["attempts"], 1);
    assert_eq!(json["recovery"]["succeeded"], 1);
    assert_eq!(json["holder"]["batches_held"], 0);
}

#[test]
fn events_carry_the_assigned_context_id() {
    let sink = Arc::new(CapturingSink::default());
    let id = Uuid::new_v4();
    let mut orch = orchestrator(sink.clone()).with_context_id(id);
    assert_eq!(orch.context_id(), id);

    orch.hold_result(SizedBatch::new(0, 1, 1)).unwrap();
    let events = sink.events.lock().unwrap();
    assert_eq!(events[0].to_json()["context_id"], id.to_string());
}
