//! Suggestion service: forwards content requests to the configured provider
//! and degrades to the static fallback instead of failing.

use std::sync::Arc;
use tracing::warn;

use crate::domain::errors::EngineResult;
use crate::domain::models::{fallback_suggestions, Suggestion, SuggestionRequest};
use crate::domain::ports::SuggestionProvider;

pub struct SuggestionService<P: SuggestionProvider> {
    provider: Arc<P>,
}

impl<P: SuggestionProvider> SuggestionService<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Always returns suggestions. Provider failures are logged and replaced
    /// with the static fallback set, never surfaced to the caller.
    pub async fn generate(&self, request: &SuggestionRequest) -> EngineResult<Vec<Suggestion>> {
        match self.provider.suggest(request).await {
            Ok(suggestions) => Ok(suggestions),
            Err(err) => {
                warn!(error = %err, selector = %request.element_selector, "suggestion provider failed, using fallback");
                Ok(fallback_suggestions(request))
            }
        }
    }
}
