//! Repository and collaborator ports for the splitlab engine.

pub mod event_repository;
pub mod suggestion_provider;
pub mod test_repository;

pub use event_repository::{EventCounts, EventRepository};
pub use suggestion_provider::{SuggestionError, SuggestionProvider};
pub use test_repository::{TestFilter, TestRepository, TestWithVariants};
