//! HTTP adapter for the external suggestion provider.
//!
//! The engine does not generate content; it forwards the request to a
//! configured endpoint and hands back whatever structured suggestions the
//! provider returns. Callers that want the fallback behavior go through
//! `services::suggestions`, not this adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::models::{Suggestion, SuggestionRequest, SuggestionsConfig};
use crate::domain::ports::{SuggestionError, SuggestionProvider};

pub struct HttpSuggestionProvider {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    suggestions: Vec<Suggestion>,
}

impl HttpSuggestionProvider {
    pub fn new(config: &SuggestionsConfig) -> Result<Self, SuggestionError> {
        if config.endpoint.trim().is_empty() {
            return Err(SuggestionError::NotConfigured);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SuggestionError::Request(e.to_string()))?;
        Ok(Self { client, endpoint: config.endpoint.clone() })
    }
}

#[async_trait]
impl SuggestionProvider for HttpSuggestionProvider {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Suggestion>, SuggestionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| SuggestionError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SuggestionError::Request(format!(
                "provider returned status {}",
                response.status()
            )));
        }

        let body: ProviderResponse = response
            .json()
            .await
            .map_err(|e| SuggestionError::InvalidResponse(e.to_string()))?;

        if body.suggestions.is_empty() {
            return Err(SuggestionError::InvalidResponse("empty suggestion list".to_string()));
        }

        Ok(body.suggestions)
    }
}
