mod parser;
mod validate;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub use parser::{load_config_str, parse_config_str, parse_str, ConfigFormat, ParsedConfig};
pub use validate::{validate_config, Validate};

pub const DEFAULT_MAX_RECOVERY_COUNT: u32 = 3;
pub const DEFAULT_AUTO_SCALER_TIMEOUT_MS: u64 = 10_000;

/// Construction-time settings for one query-execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Master switch for the whole subsystem.
    #[serde(default)]
    pub enable: bool,
    /// Gates the memory-limit handler; only a dynamically scaled topology can be rescaled.
    #[serde(default)]
    pub use_auto_scaler: bool,
    /// Row budget for buffering results while recovery is still possible. 0 disables buffering.
    #[serde(default)]
    pub holder_capacity: u64,
    #[serde(default = "default_max_recovery_count")]
    pub max_recovery_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaler: Option<AutoScalerConfig>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enable: false,
            use_auto_scaler: false,
            holder_capacity: 0,
            max_recovery_count: DEFAULT_MAX_RECOVERY_COUNT,
            auto_scaler: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AutoScalerConfig {
    pub address: String,
    pub cluster_id: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl AutoScalerConfig {
    pub fn new(address: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            cluster_id: cluster_id.into(),
            timeout_ms: DEFAULT_AUTO_SCALER_TIMEOUT_MS,
        }
    }

    pub fn address_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.address)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_max_recovery_count() -> u32 {
    DEFAULT_MAX_RECOVERY_COUNT
}

fn default_timeout_ms() -> u64 {
    DEFAULT_AUTO_SCALER_TIMEOUT_MS
}
