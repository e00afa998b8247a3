//! The serverless functions backing the app's AI features.

pub mod autocomplete;
pub mod chat;
pub mod suggestions;

pub use suggestions::{Category, Priority, SuggestionOutcome, TaskSuggestion};
