//! The recommendation service: the engine's high-level entry point.
//!
//! Routes each user message through intent classification to exactly one
//! outcome: a plain reply, a confirmation request, or a started background
//! task. Also serves synchronous recommendations and per-user preference
//! profiles.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use tablerec_core::config::TablerecConfig;
use tablerec_core::types::{
    ConfirmationRequest, Preferences, RecommendationResult, Restaurant, TaskStatus, ThinkingStep,
};

use crate::catalog::{confidence_score, default_restaurants, filter_restaurants};
use crate::confirm;
use crate::error::EngineError;
use crate::intent::{Intent, IntentClassifier};
use crate::prefs::{extract_preferences, merge_preferences};
use crate::tasks::TaskRegistry;

const MODIFY_PROMPT: &str = "I understand you'd like to modify your preferences. \
    Please tell me what you'd like to change or provide more details about what \
    you're looking for.";

/// The single outcome of processing one user message.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Ordinary conversation, no recommendation flow.
    Reply(String),
    /// Extracted preferences awaiting the user's confirmation.
    Confirmation(ConfirmationRequest),
    /// A background recommendation task was started.
    TaskStarted {
        task_id: String,
        steps: Vec<ThinkingStep>,
    },
}

/// Preferences waiting for the user to confirm, keyed by user id.
#[derive(Debug, Clone)]
struct PendingConfirmation {
    preferences: Preferences,
    original_query: String,
}

/// Central recommendation service.
pub struct RecommendService {
    catalog: Vec<Restaurant>,
    classifier: IntentClassifier,
    profiles: Mutex<HashMap<String, Preferences>>,
    contexts: Mutex<HashMap<String, PendingConfirmation>>,
    tasks: TaskRegistry,
    tick: Duration,
    max_query_length: usize,
    max_results: usize,
}

impl RecommendService {
    /// Create a service with the built-in catalog.
    pub fn new(config: &TablerecConfig) -> Self {
        Self::with_catalog(config, default_restaurants())
    }

    /// Create a service with a custom restaurant catalog.
    pub fn with_catalog(config: &TablerecConfig, catalog: Vec<Restaurant>) -> Self {
        Self {
            catalog,
            classifier: IntentClassifier::new(),
            profiles: Mutex::new(HashMap::new()),
            contexts: Mutex::new(HashMap::new()),
            tasks: TaskRegistry::new(),
            tick: Duration::from_millis(config.recommend.task_tick_ms),
            max_query_length: config.chat.max_message_length,
            max_results: config.recommend.max_results,
        }
    }

    /// Process one user message into exactly one outcome.
    pub fn process_message(
        &self,
        query: &str,
        user_id: &str,
    ) -> Result<ProcessOutcome, EngineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        if query.chars().count() > self.max_query_length {
            return Err(EngineError::QueryTooLong(self.max_query_length));
        }

        let analysis = self.classifier.classify(query);
        debug!(user_id, intent = ?analysis.intent, "Classified message");

        match analysis.intent {
            Intent::ConfirmationYes => {
                // Use the pending preferences if a confirmation was open;
                // otherwise treat the message itself as the query.
                let pending = self.take_context(user_id)?;
                let (preferences, original_query) = match pending {
                    Some(p) => (p.preferences, p.original_query),
                    None => (
                        self.extract_and_store(user_id, query)?,
                        query.to_string(),
                    ),
                };
                let task_id = self.start_task(&original_query, preferences, user_id);
                let steps = vec![ThinkingStep::thinking(
                    "start_processing",
                    "Starting recommendation process...",
                    &format!("Task ID: {}", task_id),
                )];
                Ok(ProcessOutcome::TaskStarted { task_id, steps })
            }
            Intent::ConfirmationNo => {
                self.take_context(user_id)?;
                Ok(ProcessOutcome::Confirmation(ConfirmationRequest {
                    message: MODIFY_PROMPT.to_string(),
                    preferences: self.preferences(user_id)?,
                    needs_confirmation: true,
                }))
            }
            Intent::Query => {
                let preferences = self.extract_and_store(user_id, query)?;
                self.store_context(user_id, query, &preferences)?;
                Ok(ProcessOutcome::Confirmation(confirm::confirmation_request(
                    query,
                    &preferences,
                )))
            }
            Intent::Chat => Ok(ProcessOutcome::Reply(chat_reply(query))),
        }
    }

    /// Run a recommendation synchronously, without the task machinery.
    ///
    /// When no preferences are given they are extracted from the query and
    /// merged with the user's profile.
    pub fn recommend(
        &self,
        query: &str,
        preferences: Option<Preferences>,
        user_id: &str,
        include_thinking: bool,
    ) -> Result<RecommendationResult, EngineError> {
        let preferences = match preferences {
            Some(p) => p,
            None => self.extract_and_store(user_id, query)?,
        };
        Ok(build_recommendation(
            &self.catalog,
            query,
            &preferences,
            user_id,
            include_thinking,
            self.max_results,
        ))
    }

    /// Snapshot a background task's status.
    pub fn task_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks.status(task_id)
    }

    /// Get a user's stored preference profile, creating the default lazily.
    pub fn preferences(&self, user_id: &str) -> Result<Preferences, EngineError> {
        let mut profiles = self
            .profiles
            .lock()
            .map_err(|e| EngineError::StateError(format!("profile lock poisoned: {}", e)))?;
        Ok(profiles.entry(user_id.to_string()).or_default().clone())
    }

    /// Replace a user's stored preference profile.
    pub fn update_preferences(
        &self,
        user_id: &str,
        preferences: Preferences,
    ) -> Result<Preferences, EngineError> {
        let mut profiles = self
            .profiles
            .lock()
            .map_err(|e| EngineError::StateError(format!("profile lock poisoned: {}", e)))?;
        profiles.insert(user_id.to_string(), preferences.clone());
        Ok(preferences)
    }

    /// Start a background recommendation task and return its id.
    pub fn start_task(&self, query: &str, preferences: Preferences, user_id: &str) -> String {
        let task_id = self.tasks.create();
        info!(task_id, user_id, "Starting recommendation task");

        const STAGES: &[(u8, &str)] = &[
            (10, "Analyzing your requirements..."),
            (30, "Extracting preferences..."),
            (50, "Searching restaurant database..."),
            (70, "Applying filters..."),
            (90, "Generating recommendations..."),
        ];

        let registry = self.tasks.clone();
        let catalog = self.catalog.clone();
        let tick = self.tick;
        let max_results = self.max_results;
        let query = query.to_string();
        let user_id = user_id.to_string();
        let id = task_id.clone();

        tokio::spawn(async move {
            for (i, (progress, message)) in STAGES.iter().enumerate() {
                registry.update_progress(&id, *progress, message);
                if i + 1 < STAGES.len() {
                    tokio::time::sleep(tick).await;
                }
            }
            let result =
                build_recommendation(&catalog, &query, &preferences, &user_id, true, max_results);
            registry.complete(&id, result);
        });

        task_id
    }

    // -- Private helpers --

    /// Extract preferences from a query, merge with the stored profile,
    /// and write the merged result back.
    fn extract_and_store(
        &self,
        user_id: &str,
        query: &str,
    ) -> Result<Preferences, EngineError> {
        let stored = self.preferences(user_id)?;
        let merged = merge_preferences(&extract_preferences(query), &stored);
        self.update_preferences(user_id, merged)
    }

    fn store_context(
        &self,
        user_id: &str,
        query: &str,
        preferences: &Preferences,
    ) -> Result<(), EngineError> {
        let mut contexts = self
            .contexts
            .lock()
            .map_err(|e| EngineError::StateError(format!("context lock poisoned: {}", e)))?;
        contexts.insert(
            user_id.to_string(),
            PendingConfirmation {
                preferences: preferences.clone(),
                original_query: query.to_string(),
            },
        );
        Ok(())
    }

    fn take_context(&self, user_id: &str) -> Result<Option<PendingConfirmation>, EngineError> {
        let mut contexts = self
            .contexts
            .lock()
            .map_err(|e| EngineError::StateError(format!("context lock poisoned: {}", e)))?;
        Ok(contexts.remove(user_id))
    }
}

/// Filter the catalog and assemble the full recommendation payload.
fn build_recommendation(
    catalog: &[Restaurant],
    query: &str,
    preferences: &Preferences,
    user_id: &str,
    include_thinking: bool,
    max_results: usize,
) -> RecommendationResult {
    let restaurants = filter_restaurants(catalog, query, preferences, max_results);
    let confidence = confidence_score(preferences, &restaurants);
    let thinking_steps =
        include_thinking.then(|| thinking_trace(query, preferences, catalog.len()));

    RecommendationResult {
        restaurants,
        thinking_steps,
        confidence_score: Some(confidence),
        metadata: Some(serde_json::json!({
            "query": query,
            "user_id": user_id,
            "timestamp": Utc::now().to_rfc3339(),
            "preferences": preferences,
        })),
    }
}

/// The engine's visible reasoning trace, all steps completed.
fn thinking_trace(query: &str, preferences: &Preferences, catalog_size: usize) -> Vec<ThinkingStep> {
    let keywords: Vec<&str> = query.split_whitespace().filter(|k| k.len() > 3).collect();

    let mut prefs_text = Vec::new();
    if preferences.has_types() {
        prefs_text.push(format!(
            "Restaurant Types: {}",
            preferences.restaurant_types.join(", ")
        ));
    }
    if preferences.has_flavors() {
        prefs_text.push(format!(
            "Flavor Profiles: {}",
            preferences.flavor_profiles.join(", ")
        ));
    }
    if preferences.has_purpose() {
        prefs_text.push(format!("Dining Purpose: {}", preferences.dining_purpose));
    }
    let prefs_details = if prefs_text.is_empty() {
        "Using default preferences".to_string()
    } else {
        prefs_text.join("; ")
    };

    vec![
        ThinkingStep::completed(
            "analyze_query",
            "Analyzing your requirements...",
            &format!("Identified keywords: {}", keywords.join(", ")),
        ),
        ThinkingStep::completed(
            "extract_preferences",
            "Extracting your preferences...",
            &prefs_details,
        ),
        ThinkingStep::completed(
            "search_database",
            "Searching restaurant database...",
            &format!("Screening {} restaurants for matches", catalog_size),
        ),
        ThinkingStep::completed(
            "apply_filters",
            "Applying filter conditions...",
            "Filtering by location, budget, taste preferences, etc.",
        ),
        ThinkingStep::completed(
            "rank_results",
            "Ranking and scoring recommendations...",
            "Sorting by rating and match score, selecting best recommendations",
        ),
    ]
}

/// Canned reply for ordinary conversation.
fn chat_reply(query: &str) -> String {
    let lower = query.to_lowercase();
    if ["hello", "hi", "hey", "good morning", "good evening"]
        .iter()
        .any(|g| lower.contains(g))
    {
        "Hi there! I can help you find a great place to eat in Singapore. \
         Tell me what you're in the mood for."
            .to_string()
    } else {
        "I'm best at restaurant recommendations. Tell me what kind of food, \
         area, or budget you have in mind and I'll find something for you."
            .to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
