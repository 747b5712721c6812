//! Variant suggestion CLI command.

use anyhow::Result;
use clap::Args;
use std::sync::Arc;

use crate::adapters::http::HttpSuggestionProvider;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{fallback_suggestions, Suggestion, SuggestionRequest};
use crate::infrastructure::config::ConfigLoader;
use crate::services::SuggestionService;

#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Selector of the element to suggest alternatives for
    #[arg(short, long)]
    pub selector: String,

    /// Element kind (e.g. headline, button, cta)
    #[arg(short, long, default_value = "headline")]
    pub element_type: String,

    /// Current content of the element
    #[arg(short, long)]
    pub content: String,
}

#[derive(Debug, serde::Serialize)]
pub struct SuggestOutput {
    pub suggestions: Vec<Suggestion>,
}

impl CommandOutput for SuggestOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("{} suggestion(s):", self.suggestions.len())];
        for (i, s) in self.suggestions.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, s.content));
            if let Some(rationale) = &s.rationale {
                lines.push(format!("     ({rationale})"));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: SuggestArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let request = SuggestionRequest {
        element_selector: args.selector,
        element_type: args.element_type,
        current_content: args.content,
    };

    // No endpoint configured means the static fallback, same as a provider
    // failure would.
    let suggestions = match HttpSuggestionProvider::new(&config.suggestions) {
        Ok(provider) => {
            let service = SuggestionService::new(Arc::new(provider));
            service.generate(&request).await?
        }
        Err(_) => fallback_suggestions(&request),
    };

    output(&SuggestOutput { suggestions }, json_mode);
    Ok(())
}
