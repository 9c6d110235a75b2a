//! Tablerec storage crate - SQLite-backed conversation persistence.
//!
//! Provides a WAL-mode SQLite database with migrations and a repository
//! for conversations and their messages.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::ConversationRepository;
