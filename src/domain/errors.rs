//! Domain errors for the splitlab experiment engine.

use thiserror::Error;
use uuid::Uuid;

/// Engine-level errors. Every failure carries enough structure for the
/// caller to render a precise message (field name, current state, expected
/// state); errors are never used for normal control flow.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input. Recoverable by correcting the
    /// named field.
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// Unknown test or variant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Operation not permitted in the test's current lifecycle state.
    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition { from: String, to: String, reason: String },

    /// Operation conflicts with existing records (e.g. deleting a test
    /// that has tracked events).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Activation requirements unmet.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    /// Shorthand for a field-level validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn test_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Test", id }
    }

    pub fn variant_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Variant", id }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
