//! Application state shared across all route handlers.
//!
//! AppState holds references to the engine, the conversation store, and
//! shared resources. It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use tablerec_core::config::TablerecConfig;
use tablerec_engine::RecommendService;
use tablerec_storage::{ConversationRepository, Database};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<TablerecConfig>,
    /// The recommendation engine.
    pub engine: Arc<RecommendService>,
    /// SQLite-backed conversation store.
    pub conversations: Arc<ConversationRepository>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState from a configuration and an open database.
    pub fn new(config: TablerecConfig, database: Database) -> Self {
        let database = Arc::new(database);
        let engine = Arc::new(RecommendService::new(&config));
        let conversations = Arc::new(ConversationRepository::new(database));
        Self {
            config: Arc::new(config),
            engine,
            conversations,
            start_time: Instant::now(),
        }
    }
}
