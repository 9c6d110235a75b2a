//! Tablerec core crate - shared types, configuration, and errors.
//!
//! Everything the other crates exchange lives here: the restaurant and
//! preference model, the task status snapshot, conversation records,
//! the wire shapes of the process endpoint, and the TOML configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::TablerecConfig;
pub use error::{Result, TablerecError};
