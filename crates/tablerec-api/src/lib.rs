//! HTTP surface for Tablerec.
//!
//! Exposes the process/stream/status endpoints, the synchronous recommend
//! endpoint, conversation CRUD, preference profiles, and a health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
