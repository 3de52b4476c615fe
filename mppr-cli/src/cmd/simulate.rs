use std::path::Path;
use std::sync::Arc;

use mppr_core::SizedBatch;
use mppr_exec::events::{
    EventSink, MetricsCollector, MetricsEventSink, NoOpEventSink, StdoutEventSink,
};
use mppr_exec::recovery::{RecoveryOrchestrator, RecoveryRequest};
use mppr_exec::topology::{AutoScalerTopologyFetcher, FixedTopologyFetcher, TopologyFetcher};
use serde::Serialize;
use tracing::debug;

use crate::cmd::config::load_document;
use crate::cmd::validate::render_violations;
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::scenario::{Scenario, Step, WorkerPool};
use crate::OutputArgs;

const LOCAL_NODE: &str = "127.0.0.1:3930";

#[derive(Serialize)]
struct StepReport {
    index: usize,
    step: &'static str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Serialize)]
struct SimulateResult {
    context_id: String,
    steps: Vec<StepReport>,
    delivered_batches: usize,
    delivered_rows: u64,
    held_batches: usize,
    held_rows: u64,
    recovery_count: u32,
    max_recovery_count: u32,
    terminated: bool,
    metrics: serde_json::Value,
}

/// Plays the engine's side of the protocol: results are buffered while the holder accepts them
/// and streamed to the client otherwise; a failed recovery ends the query.
///
/// Once any row of the current attempt has reached the client the attempt is committed: a
/// redispatch would deliver those rows again, so failures are no longer recovered.
struct Engine {
    orch: RecoveryOrchestrator<SizedBatch>,
    next_seq: u64,
    delivered_batches: usize,
    delivered_rows: u64,
    attempt_delivered_rows: u64,
}

impl Engine {
    fn deliver(&mut self, batch: SizedBatch) {
        debug!(seq = batch.seq, rows = batch.rows, "batch delivered to client");
        self.delivered_batches += 1;
        self.delivered_rows += batch.rows as u64;
        self.attempt_delivered_rows += batch.rows as u64;
    }

    fn drain(&mut self) -> usize {
        let mut n = 0;
        while let Some(batch) = self.orch.pop_front_batch() {
            self.deliver(batch);
            n += 1;
        }
        n
    }

    fn run_step(&mut self, step: &Step) -> (&'static str, Option<String>, bool) {
        match step {
            Step::Hold { rows, bytes } => {
                let batch = SizedBatch::new(self.next_seq, *rows, *bytes);
                self.next_seq += 1;
                if self.orch.can_hold_result() {
                    if let Err(batch) = self.orch.hold_result(batch) {
                        self.deliver(batch);
                        return ("streamed", None, false);
                    }
                    let detail = format!("held_rows={}", self.orch.num_held_rows());
                    return ("held", Some(detail), false);
                }
                let flushed = self.drain();
                self.deliver(batch);
                let detail = (flushed > 0).then(|| format!("flushed {flushed} held batch(es)"));
                ("streamed", detail, false)
            }
            Step::Fail { message, nodes } => {
                if self.attempt_delivered_rows > 0 {
                    let delivered = self.attempt_delivered_rows;
                    let flushed = self.drain();
                    let detail = format!(
                        "committed: {delivered} row(s) already delivered to client (flushed {flushed} held batch(es))"
                    );
                    return ("abandoned", Some(detail), true);
                }
                let request = match message {
                    Some(m) => RecoveryRequest::new(m.clone(), *nodes),
                    None => RecoveryRequest::without_failure(*nodes),
                };
                match self.orch.recovery(Some(&request)) {
                    Ok(()) => {
                        self.orch.reset_holder();
                        self.attempt_delivered_rows = 0;
                        let detail = format!("attempt {}", self.orch.recovery_count());
                        ("recovered", Some(detail), false)
                    }
                    Err(e) => {
                        let flushed = self.drain();
                        let detail = format!("{}: {e} (flushed {flushed} held batch(es))", e.kind());
                        ("abandoned", Some(detail), true)
                    }
                }
            }
            Step::Pop => match self.orch.pop_front_batch() {
                Some(batch) => {
                    let detail = format!("seq={} rows={}", batch.seq, batch.rows);
                    self.deliver(batch);
                    ("delivered", Some(detail), false)
                }
                None => ("empty", None, false),
            },
            Step::Drain => {
                let n = self.drain();
                ("drained", Some(format!("{n} batch(es)")), false)
            }
            Step::Reset => {
                let discarded = self.orch.num_held_batches();
                self.orch.reset_holder();
                ("reset", Some(format!("discarded {discarded} batch(es)")), false)
            }
        }
    }
}

pub fn simulate_cmd(path: &Path, events: bool, output: OutputArgs) -> i32 {
    let (scenario, _format) = match load_document::<Scenario>(path, &output) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let violations = scenario.validate();
    if !violations.is_empty() {
        print_error(
            output.format,
            output.quiet,
            &format!("invalid scenario: {}", render_violations(&violations).join("; ")),
        );
        return exit_codes::VALIDATION_FAILED;
    }

    let fetcher = match build_fetcher(&scenario) {
        Ok(f) => f,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let collector = Arc::new(MetricsCollector::new());
    let base: Arc<dyn EventSink> = if events {
        Arc::new(StdoutEventSink)
    } else {
        Arc::new(NoOpEventSink)
    };
    let sink = Arc::new(MetricsEventSink::new(collector.clone(), base));

    let mut engine = Engine {
        orch: RecoveryOrchestrator::new(&scenario.config, fetcher, None).with_event_sink(sink),
        next_seq: 0,
        delivered_batches: 0,
        delivered_rows: 0,
        attempt_delivered_rows: 0,
    };

    let mut steps = Vec::with_capacity(scenario.steps.len());
    let mut terminated = false;
    for (index, step) in scenario.steps.iter().enumerate() {
        if terminated {
            steps.push(StepReport {
                index,
                step: step.name(),
                outcome: "skipped",
                detail: None,
            });
            continue;
        }
        let (outcome, detail, stop) = engine.run_step(step);
        terminated = stop;
        steps.push(StepReport {
            index,
            step: step.name(),
            outcome,
            detail,
        });
    }

    let result = SimulateResult {
        context_id: engine.orch.context_id().to_string(),
        steps,
        delivered_batches: engine.delivered_batches,
        delivered_rows: engine.delivered_rows,
        held_batches: engine.orch.num_held_batches(),
        held_rows: engine.orch.num_held_rows(),
        recovery_count: engine.orch.recovery_count(),
        max_recovery_count: engine.orch.max_recovery_count(),
        terminated,
        metrics: collector.get_metrics().to_json(),
    };

    if output.format == OutputFormat::Text && !output.quiet {
        print_text(&result);
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}

fn build_fetcher(scenario: &Scenario) -> Result<Arc<dyn TopologyFetcher>, String> {
    match (&scenario.topology, &scenario.config.auto_scaler) {
        (Some(WorkerPool { unavailable: true, .. }), _) => Ok(Arc::new(
            FixedTopologyFetcher::unavailable("worker pool unavailable"),
        )),
        (Some(pool), _) => Ok(Arc::new(FixedTopologyFetcher::new(pool.nodes.clone()))),
        (None, Some(cfg)) => AutoScalerTopologyFetcher::new(cfg)
            .map(|f| Arc::new(f) as Arc<dyn TopologyFetcher>)
            .map_err(|e| e.to_string()),
        (None, None) => Ok(Arc::new(FixedTopologyFetcher::new(vec![
            LOCAL_NODE.to_string(),
        ]))),
    }
}

fn print_text(result: &SimulateResult) {
    println!("context {}", result.context_id);
    for s in &result.steps {
        match &s.detail {
            Some(d) => println!("  [{}] {} -> {} ({d})", s.index, s.step, s.outcome),
            None => println!("  [{}] {} -> {}", s.index, s.step, s.outcome),
        }
    }
    println!(
        "delivered {} batch(es), {} row(s); recoveries {}/{}{}",
        result.delivered_batches,
        result.delivered_rows,
        result.recovery_count,
        result.max_recovery_count,
        if result.terminated { "; query terminated" } else { "" }
    );
}
