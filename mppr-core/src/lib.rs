#![forbid(unsafe_code)]

//! Shared building blocks for MPP error recovery: configuration, hierarchical memory
//! accounting, result batches and topology types.

pub mod batch;
pub mod config;
pub mod error;
pub mod memory;
pub mod topology;

pub use crate::batch::{ResultBatch, SizedBatch};
pub use crate::config::{
    load_config_str, parse_config_str, validate_config, AutoScalerConfig, ConfigFormat,
    ParsedConfig, RecoveryConfig, Validate, DEFAULT_MAX_RECOVERY_COUNT,
};
pub use crate::error::{ConfigError, ParseError, TopologyError, ValidationError, Violation};
pub use crate::memory::MemTracker;
pub use crate::topology::{RecoveryKind, Topology};
