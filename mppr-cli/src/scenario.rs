use mppr_core::{validate_config, RecoveryConfig, Violation};
use serde::Deserialize;

/// A scripted run of one query-execution context.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: RecoveryConfig,
    #[serde(default)]
    pub topology: Option<WorkerPool>,
    /// Accepts `- hold: { rows: 1 }` maps and bare `- pop` names in both YAML and JSON.
    #[serde(deserialize_with = "serde_yaml::with::singleton_map_recursive::deserialize")]
    pub steps: Vec<Step>,
}

/// Worker pool the simulated handlers talk to. Without one, the scenario uses the configured
/// auto-scaler, or a single local node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerPool {
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub unavailable: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// A computation produced a result batch.
    Hold {
        rows: usize,
        #[serde(default)]
        bytes: i64,
    },
    /// A worker reported a failure.
    Fail {
        #[serde(default)]
        message: Option<String>,
        nodes: usize,
    },
    Pop,
    Drain,
    Reset,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Hold { .. } => "hold",
            Step::Fail { .. } => "fail",
            Step::Pop => "pop",
            Step::Drain => "drain",
            Step::Reset => "reset",
        }
    }
}

impl Scenario {
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = match validate_config(&self.config) {
            Ok(()) => Vec::new(),
            Err(e) => e
                .violations
                .into_iter()
                .map(|v| Violation::new(v.path.replacen('$', "$.config", 1), v.message))
                .collect(),
        };
        if self.steps.is_empty() {
            violations.push(Violation::new("$.steps", "must contain at least one step"));
        }
        if let Some(topo) = &self.topology {
            if !topo.unavailable && topo.nodes.is_empty() {
                violations.push(Violation::new(
                    "$.topology.nodes",
                    "must not be empty unless the pool is unavailable",
                ));
            }
        }
        violations
    }
}
