use serde::de::DeserializeOwned;

use crate::config::RecoveryConfig;
use crate::config::validate_config;
use crate::error::{ConfigError, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedConfig {
    pub config: RecoveryConfig,
    pub format: ConfigFormat,
}

pub fn parse_config_str(input: &str, format: ConfigFormat) -> Result<ParsedConfig, ParseError> {
    let (config, format) = parse_str::<RecoveryConfig>(input, format)?;
    Ok(ParsedConfig { config, format })
}

/// Parses and validates a config in one step.
pub fn load_config_str(input: &str, format: ConfigFormat) -> Result<ParsedConfig, ConfigError> {
    let parsed = parse_config_str(input, format)?;
    validate_config(&parsed.config)?;
    Ok(parsed)
}

/// Parses any JSON or YAML document, returning the format that was actually used.
pub fn parse_str<T: DeserializeOwned>(
    input: &str,
    format: ConfigFormat,
) -> Result<(T, ConfigFormat), ParseError> {
    match format {
        ConfigFormat::Json => Ok((serde_json::from_str(input)?, format)),
        ConfigFormat::Yaml => Ok((serde_yaml::from_str(input)?, format)),
        ConfigFormat::Auto => parse_auto(input),
    }
}

fn parse_auto<T: DeserializeOwned>(input: &str) -> Result<(T, ConfigFormat), ParseError> {
    // JSON always starts with `{` or `[` after trimming.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<T>(input) {
            Ok(value) => Ok((value, ConfigFormat::Json)),
            Err(e) => match serde_yaml::from_str::<T>(input) {
                Ok(value) => Ok((value, ConfigFormat::Yaml)),
                Err(_) => Err(ParseError::Json(e)),
            },
        };
    }

    match serde_yaml::from_str::<T>(input) {
        Ok(value) => Ok((value, ConfigFormat::Yaml)),
        Err(e) => {
            if let Ok(value) = serde_json::from_str::<T>(input) {
                return Ok((value, ConfigFormat::Json));
            }
            Err(ParseError::Yaml(e))
        }
    }
}
