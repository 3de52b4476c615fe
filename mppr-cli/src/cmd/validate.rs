use std::path::Path;

use mppr_core::{RecoveryConfig, Validate, Violation};
use serde::Serialize;

use crate::cmd::config::load_document;
use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<RecoveryConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
    let (config, format) = match load_document::<RecoveryConfig>(path, &output) {
        Ok(v) => v,
        Err(code) => return code,
    };

    match config.validate() {
        Ok(()) => {
            if output.format == OutputFormat::Text && !output.quiet {
                println!(
                    "ok: valid recovery config ({format:?}, enable={}, maxRecoveryCount={})",
                    config.enable, config.max_recovery_count
                );
            } else {
                let result = ValidateResult {
                    valid: true,
                    format: format!("{format:?}"),
                    config: Some(config),
                    errors: vec![],
                };
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::SUCCESS
        }
        Err(err) => {
            let errors = render_violations(&err.violations);
            if output.format == OutputFormat::Text && !output.quiet {
                eprintln!("error: {err}");
                for e in &errors {
                    eprintln!("  - {e}");
                }
            } else {
                let result = ValidateResult {
                    valid: false,
                    format: format!("{format:?}"),
                    config: None,
                    errors,
                };
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::VALIDATION_FAILED
        }
    }
}

pub fn render_violations(violations: &[Violation]) -> Vec<String> {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.path, v.message))
        .collect()
}
