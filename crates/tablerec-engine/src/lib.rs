//! Recommendation engine for Tablerec.
//!
//! Provides intent classification, preference extraction, confirmation
//! prompts, restaurant catalog filtering, and the asynchronous task
//! registry that drives background recommendation runs.

pub mod catalog;
pub mod confirm;
pub mod error;
pub mod intent;
pub mod prefs;
pub mod service;
pub mod tasks;

pub use catalog::{default_restaurants, filter_restaurants};
pub use error::EngineError;
pub use intent::{Intent, IntentAnalysis, IntentClassifier};
pub use prefs::{extract_preferences, merge_preferences, ExtractedPreferences};
pub use service::{ProcessOutcome, RecommendService};
pub use tasks::TaskRegistry;
