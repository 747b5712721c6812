//! Variant content suggestions from the external generative collaborator.
//!
//! The engine never produces these itself; it forwards the request and
//! returns whatever structured suggestions come back.

use serde::{Deserialize, Serialize};

/// A request for content suggestions for an element under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionRequest {
    /// Opaque selector for the element
    pub element_selector: String,
    /// Element kind as the caller describes it (e.g. "headline", "button")
    pub element_type: String,
    /// Current content of the element
    pub current_content: String,
}

/// One suggested alternative for the element under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Suggested replacement content
    pub content: String,
    /// Provider's rationale, when given
    #[serde(default)]
    pub rationale: Option<String>,
}

impl Suggestion {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), rationale: None }
    }
}

/// Static fallback returned when the provider is unreachable or errors.
pub fn fallback_suggestions(request: &SuggestionRequest) -> Vec<Suggestion> {
    vec![
        Suggestion::new(format!("Try a shorter version of \"{}\"", request.current_content)),
        Suggestion::new(format!(
            "Add a clear call to action near {}",
            request.element_selector
        )),
        Suggestion::new("Lead with the benefit, not the feature"),
    ]
}
