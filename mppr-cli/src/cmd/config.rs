use std::path::Path;

use mppr_core::config::parse_str;
use mppr_core::{ConfigFormat, ParseError};
use serde::de::DeserializeOwned;

use crate::exit_codes;
use crate::output::print_error;
use crate::OutputArgs;

/// Reads and parses a JSON or YAML file, reporting failures with the matching exit code.
pub fn load_document<T: DeserializeOwned>(
    path: &Path,
    output: &OutputArgs,
) -> Result<(T, ConfigFormat), i32> {
    let content = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return Err(exit_codes::RUNTIME_ERROR);
        }
    };

    match parse_str::<T>(&content, ConfigFormat::Auto) {
        Ok(parsed) => Ok(parsed),
        Err(ParseError::Json(e)) => {
            print_error(output.format, output.quiet, &format!("JSON parse failed: {e}"));
            Err(exit_codes::VALIDATION_FAILED)
        }
        Err(ParseError::Yaml(e)) => {
            print_error(output.format, output.quiet, &format!("YAML parse failed: {e}"));
            Err(exit_codes::VALIDATION_FAILED)
        }
    }
}
