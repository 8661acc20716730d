//! Application configuration
//!
//! Settings come from an optional TOML file and are then overridden by
//! `SWITCHYARD_*` environment variables. Per-request options (batch
//! parallelism, pipeline `continue_on_failure`, timeouts) override both.

use crate::error::{Result, SwitchyardError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Explicit filter directive, takes precedence over `verbose`
    pub log_level: Option<String>,
    pub registry: RegistryConfig,
    pub batch: BatchConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Check input against declared parameters before invoking handlers
    pub validate_input: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Used when a request sets no parallelism
    pub default_parallelism: usize,
    /// Upper bound applied to every request
    pub max_parallelism: usize,
    pub default_timeout_ms: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_parallelism: 1,
            max_parallelism: 32,
            default_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub continue_on_failure: bool,
    pub default_timeout_ms: Option<u64>,
}

impl AppConfig {
    /// Loads configuration from `path` (if given) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML configuration file without applying the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SwitchyardError::config_at(
                format!("Failed to read config file {}", path.display()),
                path,
                e,
            )
        })?;
        toml::from_str(&content).map_err(|e| {
            SwitchyardError::config_at(
                format!("Failed to parse config file {}", path.display()),
                path,
                e,
            )
        })
    }

    /// Applies `SWITCHYARD_*` overrides from the process environment
    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup; unparsable values are ignored
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("SWITCHYARD_LOG_LEVEL") {
            self.log_level = Some(level);
        }

        if let Some(value) = parse_var::<bool>(&lookup, "SWITCHYARD_VALIDATE_INPUT") {
            self.registry.validate_input = value;
        }

        if let Some(value) = parse_var::<usize>(&lookup, "SWITCHYARD_BATCH_PARALLELISM") {
            self.batch.default_parallelism = value;
        }

        if let Some(value) = parse_var::<usize>(&lookup, "SWITCHYARD_BATCH_MAX_PARALLELISM") {
            self.batch.max_parallelism = value;
        }

        if let Some(value) = parse_var::<u64>(&lookup, "SWITCHYARD_BATCH_TIMEOUT_MS") {
            self.batch.default_timeout_ms = Some(value);
        }

        if let Some(value) = parse_var::<bool>(&lookup, "SWITCHYARD_PIPELINE_CONTINUE_ON_FAILURE")
        {
            self.pipeline.continue_on_failure = value;
        }

        if let Some(value) = parse_var::<u64>(&lookup, "SWITCHYARD_PIPELINE_TIMEOUT_MS") {
            self.pipeline.default_timeout_ms = Some(value);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.max_parallelism == 0 {
            return Err(SwitchyardError::config(
                "batch.max_parallelism must be at least 1",
            ));
        }
        Ok(())
    }

    /// Get the log filter directive based on `log_level` or verbosity
    pub fn log_level(&self) -> &str {
        if let Some(level) = self.log_level.as_deref() {
            return level;
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.batch.default_parallelism, 1);
        assert_eq!(config.batch.max_parallelism, 32);
        assert!(!config.registry.validate_input);
        assert!(!config.pipeline.continue_on_failure);
        assert_eq!(config.log_level(), "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_from_verbosity() {
        let config = AppConfig {
            verbose: 1,
            ..Default::default()
        };
        assert_eq!(config.log_level(), "debug");

        let config = AppConfig {
            verbose: 3,
            log_level: Some("warn,switchyard=debug".to_string()),
            ..Default::default()
        };
        assert_eq!(config.log_level(), "warn,switchyard=debug");
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
verbose = 1

[registry]
validate_input = true

[batch]
default_parallelism = 4

[pipeline]
default_timeout_ms = 5000
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.verbose, 1);
        assert!(config.registry.validate_input);
        assert_eq!(config.batch.default_parallelism, 4);
        assert_eq!(config.batch.max_parallelism, 32);
        assert_eq!(config.pipeline.default_timeout_ms, Some(5000));
    }

    #[test]
    fn test_from_file_errors() {
        let missing = AppConfig::from_file(Path::new("/nonexistent/switchyard.toml"));
        assert!(matches!(missing, Err(SwitchyardError::Config { .. })));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "batch = 3").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
        match err {
            SwitchyardError::Config { path, source, .. } => {
                assert_eq!(path.as_deref(), Some(file.path()));
                let source = source.expect("parse error keeps its source");
                assert!(source.downcast_ref::<toml::de::Error>().is_some());
            }
            other => panic!("expected config error, got {other}"),
        }
    }

    #[test]
    fn test_merge_env_from() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SWITCHYARD_LOG_LEVEL", "trace"),
            ("SWITCHYARD_VALIDATE_INPUT", "true"),
            ("SWITCHYARD_BATCH_PARALLELISM", "8"),
            ("SWITCHYARD_BATCH_MAX_PARALLELISM", "not-a-number"),
            ("SWITCHYARD_PIPELINE_CONTINUE_ON_FAILURE", "true"),
            ("SWITCHYARD_PIPELINE_TIMEOUT_MS", "250"),
        ]);

        let mut config = AppConfig::default();
        config.merge_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.log_level(), "trace");
        assert!(config.registry.validate_input);
        assert_eq!(config.batch.default_parallelism, 8);
        assert_eq!(config.batch.max_parallelism, 32);
        assert!(config.pipeline.continue_on_failure);
        assert_eq!(config.pipeline.default_timeout_ms, Some(250));
        assert_eq!(config.batch.default_timeout_ms, None);
    }

    #[test]
    fn test_validate_rejects_zero_max_parallelism() {
        let mut config = AppConfig::default();
        config.batch.max_parallelism = 0;
        assert!(config.validate().is_err());
    }
}
