use crate::config::{AutoScalerConfig, RecoveryConfig};
use crate::error::{ValidationError, Violation};

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for RecoveryConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_config(self)
    }
}

pub fn validate_config(config: &RecoveryConfig) -> Result<(), ValidationError> {
    let mut v = Validator::default();
    if let Some(auto_scaler) = &config.auto_scaler {
        v.validate_auto_scaler("$.autoScaler", auto_scaler);
    }
    v.finish()
}

#[derive(Default)]
struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    fn validate_auto_scaler(&mut self, path: &str, cfg: &AutoScalerConfig) {
        match cfg.address_url() {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    self.push(format!("{path}.address"), "scheme must be http or https");
                }
                if url.host_str().is_none() {
                    self.push(format!("{path}.address"), "must include a host");
                }
            }
            Err(e) => self.push(format!("{path}.address"), format!("invalid URL: {e}")),
        }
        if cfg.cluster_id.trim().is_empty() {
            self.push(format!("{path}.clusterId"), "must not be empty");
        }
        if cfg.timeout_ms == 0 {
            self.push(format!("{path}.timeoutMs"), "must be greater than 0");
        }
    }
}
