//! Configuration structures.
//!
//! Configuration is loaded from environment variables and config files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Error, Result};

/// Environment variable toggling content-type inference.
pub const ENV_ALLOW_CONTENT_TYPE_INFERENCE: &str = "INGRESS_ALLOW_CONTENT_TYPE_INFERENCE";
/// Environment variable overriding the default content type.
pub const ENV_DEFAULT_CONTENT_TYPE: &str = "INGRESS_DEFAULT_CONTENT_TYPE";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "INGRESS_LOG_LEVEL";
/// Environment variable selecting the log format (`json` or anything else).
pub const ENV_LOG_FORMAT: &str = "INGRESS_LOG_FORMAT";

/// Global configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Incoming pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Defaults overlaid with `INGRESS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (environment in production).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_ALLOW_CONTENT_TYPE_INFERENCE) {
            self.pipeline.allow_content_type_inference =
                parse_bool(ENV_ALLOW_CONTENT_TYPE_INFERENCE, &raw)?;
        }
        if let Some(content_type) = lookup(ENV_DEFAULT_CONTENT_TYPE) {
            self.pipeline.default_content_type = content_type;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.observability.json_logs = format.eq_ignore_ascii_case("json");
        }
        Ok(self)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::validation(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

/// Incoming pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// When false, a message without a resolvable type is fatal. When true,
    /// the deserializer is asked to infer the type from the body.
    pub allow_content_type_inference: bool,

    /// Content type served by the default deserializer.
    pub default_content_type: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            allow_content_type_inference: true,
            default_content_type: "application/json".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_allow_inference() {
        let config = Config::default();
        assert!(config.pipeline.allow_content_type_inference);
        assert_eq!(config.pipeline.default_content_type, "application/json");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            Config::from_json_str(r#"{"pipeline":{"allow_content_type_inference":false}}"#)
                .unwrap();
        assert!(!config.pipeline.allow_content_type_inference);
        assert_eq!(config.pipeline.default_content_type, "application/json");
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"observability":{{"json_logs":true}}}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file("/nonexistent/ingress.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_ALLOW_CONTENT_TYPE_INFERENCE, "False"),
            (ENV_LOG_FORMAT, "JSON"),
            (ENV_DEFAULT_CONTENT_TYPE, "application/xml"),
        ]
        .into_iter()
        .collect();

        let config = Config::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(!config.pipeline.allow_content_type_inference);
        assert!(config.observability.json_logs);
        assert_eq!(config.pipeline.default_content_type, "application/xml");
    }

    #[test]
    fn test_invalid_boolean_override() {
        let result = Config::default().with_overrides(|key| {
            (key == ENV_ALLOW_CONTENT_TYPE_INFERENCE).then(|| "maybe".to_string())
        });
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
