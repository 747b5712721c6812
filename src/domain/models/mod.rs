//! Domain models for the splitlab experiment engine.

pub mod config;
pub mod event;
pub mod suggestion;
pub mod variant;

pub use config::{Config, DatabaseConfig, EvaluationConfig, LoggingConfig, SuggestionsConfig};
pub use event::{EventKind, TrackedEvent, VisitorKey};
pub use suggestion::{fallback_suggestions, Suggestion, SuggestionRequest};
pub use test::{
    AbTest, GoalType, TestDefinition, TestPatch, TestStatus, CONFIDENCE_LEVEL_RANGE,
    MIN_SAMPLE_SIZE_FLOOR,
};
pub use variant::{compute_rate, Variant, VariantChanges, VariantDefinition};
