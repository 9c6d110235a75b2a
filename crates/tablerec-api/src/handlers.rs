//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/body parameters via axum extractors,
//! interacts with AppState services, and returns JSON responses.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};

use tablerec_core::types::{
    Conversation, ConversationSummary, Message, Preferences, ProcessRequest, ProcessResponse,
    RecommendationResult, Role, TaskStatus,
};
use tablerec_engine::ProcessOutcome;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request/response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConversationRequest {
    pub title: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    pub role: Role,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub preferences: Preferences,
}

fn default_user_id() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub user_id: String,
    pub preferences: Preferences,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePreferencesResponse {
    pub message: String,
    pub preferences: Preferences,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

// =============================================================================
// Process endpoints
// =============================================================================

/// POST /api/process - route one user message to exactly one outcome.
pub async fn process(
    State(state): State<AppState>,
    Json(body): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let outcome = state.engine.process_message(&body.query, &body.user_id)?;
    Ok(Json(outcome_to_response(outcome)))
}

fn outcome_to_response(outcome: ProcessOutcome) -> ProcessResponse {
    match outcome {
        ProcessOutcome::Reply(reply) => ProcessResponse {
            reply: Some(reply),
            ..Default::default()
        },
        ProcessOutcome::Confirmation(req) => ProcessResponse {
            confirmation_request: Some(req),
            ..Default::default()
        },
        ProcessOutcome::TaskStarted { steps, .. } => ProcessResponse {
            thinking_steps: Some(steps),
            ..Default::default()
        },
    }
}

/// The user-facing text of an outcome, as streamed over SSE.
fn outcome_text(outcome: &ProcessOutcome) -> String {
    match outcome {
        ProcessOutcome::Reply(reply) => reply.clone(),
        ProcessOutcome::Confirmation(req) => req.message.clone(),
        ProcessOutcome::TaskStarted { task_id, .. } => {
            format!("Starting recommendation process... Task ID: {}", task_id)
        }
    }
}

/// POST /api/process/stream - same as /api/process, but the reply text is
/// streamed as SSE `data:` fragments followed by a done marker.
pub async fn process_stream(
    State(state): State<AppState>,
    Json(body): Json<ProcessRequest>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let mut events: Vec<Result<Event, Infallible>> = Vec::new();

    match state.engine.process_message(&body.query, &body.user_id) {
        Ok(outcome) => {
            let text = outcome_text(&outcome);
            for chunk in chunk_text(&text, state.config.chat.stream_chunk_chars) {
                let data = serde_json::json!({ "content": chunk }).to_string();
                events.push(Ok(Event::default().data(data)));
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stream processing failed");
            let data = serde_json::json!({
                "error": e.to_string(),
                "content": "Sorry, I ran into a problem handling that. Please try again.",
            })
            .to_string();
            events.push(Ok(Event::default().data(data)));
        }
    }

    let done = serde_json::json!({ "done": true }).to_string();
    events.push(Ok(Event::default().data(done)));

    Sse::new(tokio_stream::iter(events))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// Split reply text into fragments of roughly `size` characters.
///
/// Splits on char boundaries, never inside a code point.
fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// GET /api/status/{task_id} - snapshot of a background task.
pub async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatus>, ApiError> {
    state
        .engine
        .task_status(&task_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Task not found: {}", task_id)))
}

/// POST /api/recommend - synchronous recommendation from explicit
/// constraints, bypassing the confirmation flow.
pub async fn recommend(
    State(state): State<AppState>,
    Json(body): Json<RecommendRequest>,
) -> Result<Json<RecommendationResult>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }
    let result = state
        .engine
        .recommend(&body.query, body.preferences, &body.user_id, true)?;
    Ok(Json(result))
}

// =============================================================================
// Conversation endpoints
// =============================================================================

/// GET /api/conversations/{user_id} - summaries, most recent first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let conversations = state.conversations.list(&user_id)?;
    Ok(Json(ConversationsResponse { conversations }))
}

/// POST /api/conversations - create a new conversation.
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<CreateConversationRequest>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = state
        .conversations
        .create(&body.user_id, body.title.as_deref())?;
    Ok(Json(conversation))
}

/// GET /api/conversations/{user_id}/{conversation_id} - full conversation.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(String, String)>,
) -> Result<Json<Conversation>, ApiError> {
    state
        .conversations
        .find(&user_id, &conversation_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Conversation not found: {}", conversation_id)))
}

/// PUT /api/conversations/{user_id}/{conversation_id} - rename/remodel.
pub async fn update_conversation(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(String, String)>,
    Json(body): Json<UpdateConversationRequest>,
) -> Result<Json<Conversation>, ApiError> {
    if body.title.is_none() && body.model.is_none() {
        return Err(ApiError::BadRequest(
            "Provide at least one of 'title' or 'model'".to_string(),
        ));
    }

    let updated = state.conversations.update(
        &user_id,
        &conversation_id,
        body.title.as_deref(),
        body.model.as_deref(),
    )?;
    if !updated {
        return Err(ApiError::NotFound(format!(
            "Conversation not found: {}",
            conversation_id
        )));
    }

    state
        .conversations
        .find(&user_id, &conversation_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Conversation not found: {}", conversation_id)))
}

/// DELETE /api/conversations/{user_id}/{conversation_id}.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.conversations.delete(&user_id, &conversation_id)?;
    if !deleted {
        return Err(ApiError::NotFound(format!(
            "Conversation not found: {}",
            conversation_id
        )));
    }
    Ok(Json(DeleteResponse { success: true }))
}

/// POST /api/conversations/{user_id}/{conversation_id}/messages.
pub async fn add_message(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(String, String)>,
    Json(body): Json<AddMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let message = state.conversations.add_message(
        &user_id,
        &conversation_id,
        body.role,
        &body.content,
        body.metadata,
    )?;
    Ok(Json(message))
}

// =============================================================================
// Preference endpoints
// =============================================================================

/// GET /api/preferences/{user_id} - the user's stored profile.
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let preferences = state.engine.preferences(&user_id)?;
    Ok(Json(PreferencesResponse {
        user_id,
        preferences,
    }))
}

/// POST /api/preferences - replace the user's stored profile.
pub async fn update_preferences(
    State(state): State<AppState>,
    Json(body): Json<UpdatePreferencesRequest>,
) -> Result<Json<UpdatePreferencesResponse>, ApiError> {
    let preferences = state
        .engine
        .update_preferences(&body.user_id, body.preferences)?;
    Ok(Json(UpdatePreferencesResponse {
        message: "Preferences updated successfully".to_string(),
        preferences,
    }))
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}
