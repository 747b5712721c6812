use crate::domain::models::{Suggestion, SuggestionRequest};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the external suggestion collaborator. These never surface to
/// engine callers; the suggestion service substitutes the static fallback.
#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("Provider request failed: {0}")]
    Request(String),
    #[error("Provider returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("No provider configured")]
    NotConfigured,
}

/// Port for the external generative-content collaborator.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Suggestion>, SuggestionError>;
}
