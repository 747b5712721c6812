//! Runtime configuration for the splitlab engine.
//!
//! Every section falls back to its `Default` impl field by field, so a
//! config file only needs the keys it actually overrides.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Defaults applied to new tests when a definition leaves them unset.
    pub evaluation: EvaluationConfig,
    pub suggestions: SuggestionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Connection pool cap.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: ".splitlab/splitlab.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    pub level: String,
    /// Either "json" or "pretty".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct EvaluationConfig {
    /// Default minimum impressions per arm.
    pub min_sample_size: u32,
    /// Default confidence level.
    pub confidence_level: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 100,
            confidence_level: 0.95,
        }
    }
}

/// External suggestion provider settings. An empty endpoint disables the
/// remote call and routes every request to the static fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SuggestionsConfig {
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: 10,
        }
    }
}
