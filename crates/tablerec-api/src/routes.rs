//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, and all
//! endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tablerec_core::config::TablerecConfig;
use tablerec_core::error::TablerecError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/process", post(handlers::process))
        .route("/api/process/stream", post(handlers::process_stream))
        .route("/api/status/{task_id}", get(handlers::task_status))
        .route("/api/recommend", post(handlers::recommend))
        .route(
            "/api/conversations",
            post(handlers::create_conversation),
        )
        .route(
            "/api/conversations/{user_id}",
            get(handlers::list_conversations),
        )
        .route(
            "/api/conversations/{user_id}/{conversation_id}",
            get(handlers::get_conversation)
                .put(handlers::update_conversation)
                .delete(handlers::delete_conversation),
        )
        .route(
            "/api/conversations/{user_id}/{conversation_id}/messages",
            post(handlers::add_message),
        )
        .route("/api/preferences/{user_id}", get(handlers::get_preferences))
        .route("/api/preferences", post(handlers::update_preferences))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        // Browser front-ends are served from arbitrary hosts.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server on the configured address.
pub async fn start_server(config: &TablerecConfig, state: AppState) -> Result<(), TablerecError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TablerecError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| TablerecError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
