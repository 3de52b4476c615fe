mod error;
mod handler;
mod orchestrator;

pub use error::RecoveryError;
pub use handler::{MemLimitHandler, RecoveryHandler, MEMORY_LIMIT_SIGNATURE};
pub use orchestrator::RecoveryOrchestrator;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Input for one recovery attempt.
#[derive(Debug)]
pub struct RecoveryRequest {
    /// The worker-side failure. A request without one is rejected as invalid input.
    pub failure: Option<BoxError>,
    /// Number of nodes involved in the failed MPP computation.
    pub node_count: usize,
}

impl RecoveryRequest {
    pub fn new(failure: impl Into<BoxError>, node_count: usize) -> Self {
        Self {
            failure: Some(failure.into()),
            node_count,
        }
    }

    pub fn without_failure(node_count: usize) -> Self {
        Self {
            failure: None,
            node_count,
        }
    }
}
