//! Hierarchical configuration loading.
//!
//! Precedence, lowest to highest: built-in defaults, `.splitlab/config.yaml`
//! (written by `splitlab init`), `.splitlab/local.yaml`, then `SPLITLAB_*`
//! environment variables with `__` separating nesting levels. Configuration
//! is always project-local so several sites can run engines on one machine
//! without clashing.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::{CONFIDENCE_LEVEL_RANGE, MIN_SAMPLE_SIZE_FLOOR};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid min_sample_size: {0}. Must be at least {1}")]
    InvalidMinSampleSize(u32, u32),

    #[error("Invalid confidence_level: {0}. Must be between {1} and {2}")]
    InvalidConfidenceLevel(f64, f64, f64),

    #[error("Invalid suggestions timeout: {0}. Must be at least 1 second")]
    InvalidSuggestionTimeout(u64),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Merge every configuration layer and validate the result.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".splitlab/config.yaml"))
            .merge(Yaml::file(".splitlab/local.yaml"))
            .merge(Env::prefixed("SPLITLAB_").split("__"))
            .extract()
            .context("Failed to extract configuration")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load a single file on top of the defaults, skipping the hierarchy.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        check_database(config)?;
        check_logging(config)?;
        check_evaluation(config)?;
        check_suggestions(config)
    }
}

fn check_database(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.is_empty() {
        return Err(ConfigError::EmptyDatabasePath);
    }
    if config.database.max_connections == 0 {
        return Err(ConfigError::InvalidMaxConnections(0));
    }
    Ok(())
}

fn check_logging(config: &Config) -> Result<(), ConfigError> {
    let level = config.logging.level.as_str();
    if !["trace", "debug", "info", "warn", "error"].contains(&level) {
        return Err(ConfigError::InvalidLogLevel(level.to_string()));
    }
    let format = config.logging.format.as_str();
    if !["json", "pretty"].contains(&format) {
        return Err(ConfigError::InvalidLogFormat(format.to_string()));
    }
    Ok(())
}

fn check_evaluation(config: &Config) -> Result<(), ConfigError> {
    if config.evaluation.min_sample_size < MIN_SAMPLE_SIZE_FLOOR {
        return Err(ConfigError::InvalidMinSampleSize(
            config.evaluation.min_sample_size,
            MIN_SAMPLE_SIZE_FLOOR,
        ));
    }

    let (low, high) = CONFIDENCE_LEVEL_RANGE;
    let level = config.evaluation.confidence_level;
    if !(low..=high).contains(&level) {
        return Err(ConfigError::InvalidConfidenceLevel(level, low, high));
    }
    Ok(())
}

fn check_suggestions(config: &Config) -> Result<(), ConfigError> {
    if config.suggestions.timeout_secs == 0 {
        return Err(ConfigError::InvalidSuggestionTimeout(0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).unwrap();

        assert_eq!(config.database.path, ".splitlab/splitlab.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.evaluation.min_sample_size, 100);
        assert!((config.evaluation.confidence_level - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r"
database:
  path: /custom/path.db
evaluation:
  min_sample_size: 250
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.evaluation.min_sample_size, 250);
        assert_eq!(config.logging.format, "pretty");
        ConfigLoader::validate(&config).unwrap();
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(level) if level == "verbose"));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogFormat(_)));
    }

    #[test]
    fn test_rejects_bad_database_settings() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyDatabasePath
        ));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxConnections(0)
        ));
    }

    #[test]
    fn test_rejects_sample_size_below_floor() {
        let mut config = Config::default();
        config.evaluation.min_sample_size = 3;

        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMinSampleSize(3, _)));
    }

    #[test]
    fn test_rejects_confidence_level_out_of_range() {
        for level in [0.5, 0.999] {
            let mut config = Config::default();
            config.evaluation.confidence_level = level;

            let err = ConfigLoader::validate(&config).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidConfidenceLevel(..)));
        }
    }

    #[test]
    fn test_later_layers_override_earlier_ones() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base = NamedTempFile::new().unwrap();
        writeln!(
            base,
            "logging:\n  level: info\n  format: json\nevaluation:\n  min_sample_size: 150"
        )
        .unwrap();
        base.flush().unwrap();

        let mut local = NamedTempFile::new().unwrap();
        writeln!(local, "logging:\n  level: debug").unwrap();
        local.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base.path()))
            .merge(Yaml::file(local.path()))
            .extract()
            .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.evaluation.min_sample_size, 150);
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "suggestions:\n  endpoint: http://localhost:9000/suggest").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.suggestions.endpoint, "http://localhost:9000/suggest");
        assert_eq!(config.suggestions.timeout_secs, 10);
    }
}
