//! Splitlab - A/B experiment engine
//!
//! Splitlab manages A/B tests for web content: test and variant definitions,
//! deterministic sticky visitor assignment, durable impression/conversion
//! tracking, and two-proportion significance evaluation.
//!
//! # Layout
//!
//! The crate is layered hexagonally: services depend only on the domain
//! ports, adapters implement them.
//!
//! - `domain`: models, errors, and the repository/provider ports
//! - `services`: the engine's operations on top of the ports
//! - `adapters`: SQLite persistence and the HTTP suggestion provider
//! - `infrastructure`: configuration loading and logging setup
//! - `cli`: the `splitlab` command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use splitlab::adapters::sqlite::{initialize_configured_database, SqliteTestRepository};
//! use splitlab::domain::models::DatabaseConfig;
//! use splitlab::services::VariantAssignor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = initialize_configured_database(&DatabaseConfig::default()).await?;
//!     let assignor = VariantAssignor::new(Arc::new(SqliteTestRepository::new(pool)));
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{EngineError, EngineResult};
pub use domain::models::{
    AbTest, Config, DatabaseConfig, EvaluationConfig, EventKind, GoalType, LoggingConfig,
    Suggestion, SuggestionRequest, SuggestionsConfig, TestDefinition, TestPatch, TestStatus,
    TrackedEvent, Variant, VariantDefinition, VisitorKey,
};
pub use domain::ports::{
    EventRepository, SuggestionProvider, TestFilter, TestRepository, TestWithVariants,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    EventRecorder, LifecycleController, SignificanceEvaluator, SuggestionService, TestRegistry,
    VariantAssignor, Verdict,
};
