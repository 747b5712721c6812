//! HTTP adapters for external collaborators.

pub mod suggestions;

pub use suggestions::HttpSuggestionProvider;
