use std::sync::{Arc, Mutex};

use mppr_core::{
    MemTracker, RecoveryConfig, RecoveryKind, SizedBatch, Topology, TopologyError,
};
use mppr_exec::recovery::{
    RecoveryError, RecoveryHandler, RecoveryOrchestrator, RecoveryRequest,
};
use mppr_exec::topology::{FixedTopologyFetcher, TopologyFetcher};

struct RecordingFetcher {
    calls: Mutex<Vec<(RecoveryKind, usize)>>,
    fail_with: Option<TopologyError>,
}

impl RecordingFetcher {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    fn failing(err: TopologyError) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(err),
        })
    }

    fn calls(&self) -> Vec<(RecoveryKind, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TopologyFetcher for RecordingFetcher {
    fn fetch_topology(&self) -> Result<Topology, TopologyError> {
        Ok(Topology::new(vec!["10.0.0.1:3930".to_string()]))
    }

    fn recover_and_fetch(
        &self,
        kind: RecoveryKind,
        node_count: usize,
    ) -> Result<Topology, TopologyError> {
        self.calls.lock().unwrap().push((kind, node_count));
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(Topology::new(vec!["10.0.0.1:3930".to_string(); node_count * 2])),
        }
    }
}

fn config(enable: bool, use_auto_scaler: bool, capacity: u64) -> RecoveryConfig {
    RecoveryConfig {
        enable,
        use_auto_scaler,
        holder_capacity: capacity,
        ..Default::default()
    }
}

fn orchestrator(
    cfg: &RecoveryConfig,
    fetcher: Arc<dyn TopologyFetcher>,
) -> RecoveryOrchestrator<SizedBatch> {
    RecoveryOrchestrator::new(cfg, fetcher, None)
}

fn mem_limit_request(nodes: usize) -> RecoveryRequest {
    RecoveryRequest::new(
        "Code: 241. DB::Exception: Memory limit (for query) exceeded: would use 12.00 GiB",
        nodes,
    )
}

#[test]
fn scenario_a_holder_capacity_and_latch() {
    let fetcher = RecordingFetcher::ok();
    let mut orch = orchestrator(&config(true, true, 100), fetcher);

    orch.hold_result(SizedBatch::new(0, 60, 600)).unwrap();
    assert!(orch.can_hold_result());

    orch.hold_result(SizedBatch::new(1, 50, 500)).unwrap();
    assert_eq!(orch.num_held_rows(), 110);
    assert!(!orch.can_hold_result());

    let first = orch.pop_front_batch().unwrap();
    assert_eq!(first.seq, 0);
    assert_eq!(first.rows, 60);
    assert!(!orch.can_hold_result());
    assert_eq!(orch.num_held_rows(), 110);
    assert_eq!(orch.num_held_batches(), 1);

    orch.reset_holder();
    assert_eq!(orch.num_held_rows(), 0);
    assert_eq!(orch.num_held_batches(), 0);
    assert!(orch.can_hold_result());
}

#[test]
fn scenario_b_budget_exhaustion_with_unclassified_failures() {
    let fetcher = RecordingFetcher::ok();
    let mut orch = orchestrator(&config(true, true, 100), fetcher.clone());
    let req = RecoveryRequest::new("region unavailable", 3);

    for expected in 1..=3 {
        assert_eq!(orch.recovery(Some(&req)), Err(RecoveryError::Unclassified));
        assert_eq!(orch.recovery_count(), expected);
    }
    assert_eq!(
        orch.recovery(Some(&req)),
        Err(RecoveryError::BudgetExceeded { current: 3, max: 3 })
    );
    assert_eq!(orch.recovery_count(), 3);
    assert!(fetcher.calls().is_empty());
}

#[test]
fn memory_limit_failure_routes_to_auto_scaler() {
    let fetcher = RecordingFetcher::ok();
    let mut orch = orchestrator(&config(true, true, 0), fetcher.clone());

    orch.recovery(Some(&mem_limit_request(4))).unwrap();
    assert_eq!(orch.recovery_count(), 1);
    assert_eq!(fetcher.calls(), vec![(RecoveryKind::MemoryLimit, 4)]);
}

#[test]
fn memory_limit_failure_without_auto_scaler_is_unclassified() {
    let fetcher = RecordingFetcher::ok();
    let mut orch = orchestrator(&config(true, false, 0), fetcher.clone());

    let err = orch.recovery(Some(&mem_limit_request(4))).unwrap_err();
    assert_eq!(err, RecoveryError::Unclassified);
    assert_eq!(err.to_string(), "no handler to recover this type of failure");
    assert!(fetcher.calls().is_empty());
    assert_eq!(orch.recovery_count(), 1);
}

#[test]
fn disabled_recovery_is_rejected_without_charging() {
    let fetcher = RecordingFetcher::ok();
    let mut orch = orchestrator(&config(false, true, 100), fetcher.clone());

    for _ in 0..5 {
        let err = orch.recovery(Some(&mem_limit_request(2))).unwrap_err();
        assert_eq!(err, RecoveryError::NotEnabled);
        assert!(!err.charged());
    }
    assert_eq!(orch.recovery_count(), 0);
    assert!(fetcher.calls().is_empty());
}

#[test]
fn disabled_orchestrator_hands_batches_back_and_never_drains() {
    let mut orch = orchestrator(&config(false, false, 100), RecordingFetcher::ok());
    let rejected = orch.hold_result(SizedBatch::new(7, 10, 10)).unwrap_err();
    assert_eq!(rejected.seq, 7);
    assert_eq!(orch.num_held_batches(), 0);
    assert!(orch.pop_front_batch().is_none());
}

#[test]
fn missing_request_or_failure_is_invalid_input() {
    let mut orch = orchestrator(&config(true, true, 0), RecordingFetcher::ok());

    assert_eq!(orch.recovery(None), Err(RecoveryError::InvalidInput));
    assert_eq!(
        orch.recovery(Some(&RecoveryRequest::without_failure(3))),
        Err(RecoveryError::InvalidInput)
    );
    assert_eq!(orch.recovery_count(), 0);
}

#[test]
fn handler_failure_is_propagated_and_still_charged() {
    let service_err = TopologyError::Status {
        status: 503,
        body: "pool exhausted".to_string(),
    };
    let fetcher = RecordingFetcher::failing(service_err.clone());
    let mut orch = orchestrator(&config(true, true, 0), fetcher.clone());

    let err = orch.recovery(Some(&mem_limit_request(2))).unwrap_err();
    assert_eq!(err, RecoveryError::Handler(service_err.clone()));
    assert_eq!(err.to_string(), service_err.to_string());
    assert!(err.charged());
    assert_eq!(orch.recovery_count(), 1);
    assert_eq!(fetcher.calls().len(), 1);
}

#[test]
fn failing_handler_exhausts_budget_at_the_same_pace() {
    let fetcher = RecordingFetcher::failing(TopologyError::Unavailable("down".to_string()));
    let cfg = RecoveryConfig {
        max_recovery_count: 2,
        ..config(true, true, 0)
    };
    let mut orch = orchestrator(&cfg, fetcher.clone());
    let req = mem_limit_request(1);

    assert!(matches!(orch.recovery(Some(&req)), Err(RecoveryError::Handler(_))));
    assert!(matches!(orch.recovery(Some(&req)), Err(RecoveryError::Handler(_))));
    assert_eq!(
        orch.recovery(Some(&req)),
        Err(RecoveryError::BudgetExceeded { current: 2, max: 2 })
    );
    assert_eq!(fetcher.calls().len(), 2);
}

#[test]
fn zero_budget_rejects_first_attempt() {
    let cfg = RecoveryConfig {
        max_recovery_count: 0,
        ..config(true, true, 0)
    };
    let mut orch = orchestrator(&cfg, RecordingFetcher::ok());
    assert_eq!(
        orch.recovery(Some(&mem_limit_request(1))),
        Err(RecoveryError::BudgetExceeded { current: 0, max: 0 })
    );
}

struct NamedHandler {
    name: &'static str,
    matches: bool,
    invoked: Arc<Mutex<Vec<&'static str>>>,
}

impl RecoveryHandler for NamedHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    fn classify(&self, _failure: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
        self.matches
    }

    fn recover(&self, _request: &RecoveryRequest) -> Result<(), TopologyError> {
        self.invoked.lock().unwrap().push(self.name);
        Ok(())
    }
}

#[test]
fn first_matching_handler_wins() {
    let invoked = Arc::new(Mutex::new(Vec::new()));
    let handler = |name: &'static str, matches: bool| -> Box<dyn RecoveryHandler> {
        Box::new(NamedHandler {
            name,
            matches,
            invoked: invoked.clone(),
        })
    };
    let mut orch: RecoveryOrchestrator<SizedBatch> = RecoveryOrchestrator::with_handlers(
        &config(true, false, 0),
        vec![handler("skip", false), handler("first", true)],
        None,
    );
    orch.register_handler(handler("second", true));
    assert_eq!(orch.handler_names(), vec!["skip", "first", "second"]);

    orch.recovery(Some(&RecoveryRequest::new("anything", 1))).unwrap();
    assert_eq!(*invoked.lock().unwrap(), vec!["first"]);
}

#[test]
fn reset_holder_does_not_touch_budget_or_config() {
    let cfg = RecoveryConfig {
        max_recovery_count: 5,
        ..config(true, true, 10)
    };
    let mut orch = orchestrator(&cfg, RecordingFetcher::ok());
    orch.hold_result(SizedBatch::new(0, 10, 1)).unwrap();
    orch.recovery(Some(&mem_limit_request(1))).unwrap();

    orch.reset_holder();
    assert!(orch.enabled());
    assert_eq!(orch.holder().capacity(), 10);
    assert_eq!(orch.max_recovery_count(), 5);
    assert_eq!(orch.recovery_count(), 1);
    assert!(orch.can_hold_result());
}

#[test]
fn holder_memory_is_scoped_under_parent_budget() {
    let parent = MemTracker::new("query-42");
    let mut orch: RecoveryOrchestrator<SizedBatch> = RecoveryOrchestrator::new(
        &config(true, true, 1_000),
        Arc::new(FixedTopologyFetcher::new(vec!["n1".to_string()])),
        Some(&parent),
    );
    orch.hold_result(SizedBatch::new(0, 10, 1_024)).unwrap();
    orch.hold_result(SizedBatch::new(1, 10, 2_048)).unwrap();
    assert_eq!(parent.bytes_consumed(), 3_072);

    orch.pop_front_batch().unwrap();
    assert_eq!(parent.bytes_consumed(), 2_048);

    orch.reset_holder();
    assert_eq!(parent.bytes_consumed(), 0);
}

#[test]
fn dropping_an_orchestrator_mid_query_releases_held_memory() {
    let parent = MemTracker::new("query");
    let mut orch: RecoveryOrchestrator<SizedBatch> = RecoveryOrchestrator::new(
        &config(true, true, 1_000),
        Arc::new(FixedTopologyFetcher::new(vec!["n1".to_string()])),
        Some(&parent),
    );
    orch.hold_result(SizedBatch::new(0, 10, 4_096)).unwrap();
    assert_eq!(parent.bytes_consumed(), 4_096);

    drop(orch);
    assert_eq!(parent.bytes_consumed(), 0);
}

#[test]
fn fixed_pool_recovery_succeeds_and_unavailable_pool_fails() {
    let mut ok = orchestrator(
        &config(true, true, 0),
        Arc::new(FixedTopologyFetcher::new(vec!["n1".to_string()])),
    );
    ok.recovery(Some(&mem_limit_request(1))).unwrap();

    let mut down = orchestrator(
        &config(true, true, 0),
        Arc::new(FixedTopologyFetcher::unavailable("maintenance")),
    );
    assert_eq!(
        down.recovery(Some(&mem_limit_request(1))),
        Err(RecoveryError::Handler(TopologyError::Unavailable(
            "maintenance".to_string()
        )))
    );
}
