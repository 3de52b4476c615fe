mod autoscaler;

use mppr_core::{RecoveryKind, Topology, TopologyError};

pub use autoscaler::AutoScalerTopologyFetcher;

/// Source of worker topology for MPP dispatch.
///
/// Implementations are injected into the recovery handlers at construction; there is no
/// process-wide fetcher.
pub trait TopologyFetcher: Send + Sync {
    fn fetch_topology(&self) -> Result<Topology, TopologyError>;

    /// Performs the corrective action for `kind` on a computation that ran on `node_count`
    /// nodes and returns the resulting topology.
    fn recover_and_fetch(
        &self,
        kind: RecoveryKind,
        node_count: usize,
    ) -> Result<Topology, TopologyError>;
}

/// A fixed worker pool. It cannot rescale, so recovery hands back the same pool.
#[derive(Debug, Clone)]
pub struct FixedTopologyFetcher {
    topology: Topology,
    unavailable: Option<String>,
}

impl FixedTopologyFetcher {
    pub fn new(nodes: Vec<String>) -> Self {
        Self {
            topology: Topology::new(nodes),
            unavailable: None,
        }
    }

    /// A fetcher whose every call fails with [`TopologyError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            topology: Topology::default(),
            unavailable: Some(reason.into()),
        }
    }
}

impl TopologyFetcher for FixedTopologyFetcher {
    fn fetch_topology(&self) -> Result<Topology, TopologyError> {
        match &self.unavailable {
            Some(reason) => Err(TopologyError::Unavailable(reason.clone())),
            None => Ok(self.topology.clone()),
        }
    }

    fn recover_and_fetch(
        &self,
        _kind: RecoveryKind,
        _node_count: usize,
    ) -> Result<Topology, TopologyError> {
        self.fetch_topology()
    }
}
