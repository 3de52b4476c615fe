use std::error::Error;
use std::sync::Arc;

use mppr_core::{RecoveryKind, TopologyError};
use tracing::debug;

use crate::recovery::RecoveryRequest;
use crate::topology::TopologyFetcher;

/// Text that identifies a per-node memory-limit failure.
///
/// Matching free-text error messages is a weak contract: a reworded message on the worker side
/// silently turns a recoverable failure into an unclassified one.
pub const MEMORY_LIMIT_SIGNATURE: &str = "Memory limit";

/// One strategy in the orchestrator's handler chain.
pub trait RecoveryHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this handler knows how to recover `failure`.
    fn classify(&self, failure: &(dyn Error + Send + Sync + 'static)) -> bool;

    /// Runs the corrective action once. Retries are budgeted by the orchestrator.
    fn recover(&self, request: &RecoveryRequest) -> Result<(), TopologyError>;
}

/// Recovers memory-limit failures by asking the auto-scaler to rescale the compute pool.
pub struct MemLimitHandler {
    use_auto_scaler: bool,
    fetcher: Arc<dyn TopologyFetcher>,
}

impl MemLimitHandler {
    pub fn new(use_auto_scaler: bool, fetcher: Arc<dyn TopologyFetcher>) -> Self {
        Self {
            use_auto_scaler,
            fetcher,
        }
    }
}

impl RecoveryHandler for MemLimitHandler {
    fn name(&self) -> &'static str {
        "memory_limit"
    }

    fn classify(&self, failure: &(dyn Error + Send + Sync + 'static)) -> bool {
        self.use_auto_scaler && failure.to_string().contains(MEMORY_LIMIT_SIGNATURE)
    }

    fn recover(&self, request: &RecoveryRequest) -> Result<(), TopologyError> {
        // Dropped here: the next dispatch fetches its own topology.
        let topology = self
            .fetcher
            .recover_and_fetch(RecoveryKind::MemoryLimit, request.node_count)?;
        debug!(
            node_count = request.node_count,
            new_node_count = topology.len(),
            "auto-scaler accepted memory-limit recovery"
        );
        Ok(())
    }
}
