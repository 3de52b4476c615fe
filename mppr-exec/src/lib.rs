#![forbid(unsafe_code)]

//! Error recovery for MPP query execution.
//!
//! The engine streams result batches into a [`RecoveryOrchestrator`] while buffering is still
//! allowed, and on a worker failure asks it whether the failure can be recovered. The
//! orchestrator classifies the failure against an ordered handler chain, charges one unit of a
//! fixed retry budget and runs the first matching handler's corrective action.

pub mod events;
pub mod holder;
pub mod recovery;
pub mod topology;

pub use crate::events::{
    CompositeEventSink, Event, EventSink, MetricsCollector, MetricsEventSink, NoOpEventSink,
    RecoveryMetrics, StdoutEventSink,
};
pub use crate::holder::{HolderState, ResultHolder};
pub use crate::recovery::{
    BoxError, MemLimitHandler, RecoveryError, RecoveryHandler, RecoveryOrchestrator,
    RecoveryRequest, MEMORY_LIMIT_SIGNATURE,
};
pub use crate::topology::{AutoScalerTopologyFetcher, FixedTopologyFetcher, TopologyFetcher};
