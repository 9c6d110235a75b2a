//! Repository for SQLite-backed conversation persistence.
//!
//! Operates on the Database struct using raw SQL. Handles conversation
//! lifecycle, message appends with metadata, preview maintenance, and
//! auto-titling from the first user message.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use tablerec_core::error::TablerecError;
use tablerec_core::types::{Conversation, ConversationSummary, Message, Role};

use crate::db::Database;

/// Maximum characters of a message kept as the conversation preview.
const PREVIEW_CHARS: usize = 100;

/// Maximum characters of the first user message used as the title.
const TITLE_CHARS: usize = 30;

const DEFAULT_TITLE: &str = "New Chat";
const DEFAULT_MODEL: &str = "Tablerec";
const DEFAULT_PREVIEW: &str = "Start a new conversation...";

/// Repository for conversations and their messages.
pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a new conversation for a user.
    pub fn create(&self, user_id: &str, title: Option<&str>) -> Result<Conversation, TablerecError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let title = title.unwrap_or(DEFAULT_TITLE).to_string();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (id, user_id, title, model, last_message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    user_id,
                    title,
                    DEFAULT_MODEL,
                    DEFAULT_PREVIEW,
                    now.timestamp(),
                    now.timestamp(),
                ],
            )
            .map_err(|e| TablerecError::Storage(format!("Failed to create conversation: {}", e)))?;
            Ok(())
        })?;

        Ok(Conversation {
            id,
            user_id: user_id.to_string(),
            title,
            model: DEFAULT_MODEL.to_string(),
            last_message: DEFAULT_PREVIEW.to_string(),
            created_at: ts_to_datetime(now.timestamp()),
            updated_at: ts_to_datetime(now.timestamp()),
            messages: Vec::new(),
        })
    }

    /// Fetch a conversation with its messages in chronological order.
    pub fn find(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, TablerecError> {
        self.db.with_conn(|conn| {
            let header = conn
                .query_row(
                    "SELECT id, user_id, title, model, last_message, created_at, updated_at
                     FROM conversations WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![conversation_id, user_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                            row.get::<_, i64>(6)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| TablerecError::Storage(e.to_string()))?;

            let Some((id, user_id, title, model, last_message, created_at, updated_at)) = header
            else {
                return Ok(None);
            };

            let mut stmt = conn
                .prepare(
                    "SELECT role, content, metadata, timestamp
                     FROM messages WHERE conversation_id = ?1
                     ORDER BY timestamp ASC, id ASC",
                )
                .map_err(|e| TablerecError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|e| TablerecError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, content, metadata, timestamp) =
                    row.map_err(|e| TablerecError::Storage(e.to_string()))?;
                messages.push(row_to_message(&role, content, metadata, timestamp)?);
            }

            Ok(Some(Conversation {
                id,
                user_id,
                title,
                model,
                last_message,
                created_at: ts_to_datetime(created_at),
                updated_at: ts_to_datetime(updated_at),
                messages,
            }))
        })
    }

    /// List a user's conversations as summaries, most recently updated first.
    pub fn list(&self, user_id: &str) -> Result<Vec<ConversationSummary>, TablerecError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT c.id, c.user_id, c.title, c.model, c.last_message,
                            c.created_at, c.updated_at,
                            (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id)
                     FROM conversations c
                     WHERE c.user_id = ?1
                     ORDER BY c.updated_at DESC",
                )
                .map_err(|e| TablerecError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    Ok(ConversationSummary {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        title: row.get(2)?,
                        model: row.get(3)?,
                        last_message: row.get(4)?,
                        created_at: ts_to_datetime(row.get(5)?),
                        updated_at: ts_to_datetime(row.get(6)?),
                        message_count: row.get::<_, i64>(7)? as usize,
                    })
                })
                .map_err(|e| TablerecError::Storage(e.to_string()))?;

            let mut summaries = Vec::new();
            for row in rows {
                summaries.push(row.map_err(|e| TablerecError::Storage(e.to_string()))?);
            }
            Ok(summaries)
        })
    }

    /// Append a message to a conversation.
    ///
    /// Updates the conversation's preview and updated_at. The first user
    /// message replaces the default "New Chat" title.
    pub fn add_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Message, TablerecError> {
        let now = Utc::now();

        self.db.with_conn(|conn| {
            let title: Option<String> = conn
                .query_row(
                    "SELECT title FROM conversations WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![conversation_id, user_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| TablerecError::Storage(e.to_string()))?;

            let Some(title) = title else {
                return Err(TablerecError::ConversationNotFound(
                    conversation_id.to_string(),
                ));
            };

            let metadata_text = metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| TablerecError::Storage(e.to_string()))?;

            conn.execute(
                "INSERT INTO messages (conversation_id, role, content, metadata, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    conversation_id,
                    role.as_str(),
                    content,
                    metadata_text,
                    now.timestamp(),
                ],
            )
            .map_err(|e| TablerecError::Storage(format!("Failed to add message: {}", e)))?;

            conn.execute(
                "UPDATE conversations SET last_message = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![preview_of(content), now.timestamp(), conversation_id],
            )
            .map_err(|e| TablerecError::Storage(e.to_string()))?;

            if title == DEFAULT_TITLE && role == Role::User {
                conn.execute(
                    "UPDATE conversations SET title = ?1 WHERE id = ?2",
                    rusqlite::params![title_of(content), conversation_id],
                )
                .map_err(|e| TablerecError::Storage(e.to_string()))?;
            }

            Ok(())
        })?;

        Ok(Message {
            role,
            content: content.to_string(),
            metadata,
            timestamp: ts_to_datetime(now.timestamp()),
        })
    }

    /// Update a conversation's title and/or model.
    ///
    /// Returns false if the conversation does not exist for this user.
    pub fn update(
        &self,
        user_id: &str,
        conversation_id: &str,
        title: Option<&str>,
        model: Option<&str>,
    ) -> Result<bool, TablerecError> {
        self.db.with_conn(|conn| {
            let mut changed = 0;
            if let Some(title) = title {
                changed += conn
                    .execute(
                        "UPDATE conversations SET title = ?1, updated_at = ?2
                         WHERE id = ?3 AND user_id = ?4",
                        rusqlite::params![
                            title,
                            Utc::now().timestamp(),
                            conversation_id,
                            user_id
                        ],
                    )
                    .map_err(|e| TablerecError::Storage(e.to_string()))?;
            }
            if let Some(model) = model {
                changed += conn
                    .execute(
                        "UPDATE conversations SET model = ?1, updated_at = ?2
                         WHERE id = ?3 AND user_id = ?4",
                        rusqlite::params![
                            model,
                            Utc::now().timestamp(),
                            conversation_id,
                            user_id
                        ],
                    )
                    .map_err(|e| TablerecError::Storage(e.to_string()))?;
            }
            Ok(changed > 0)
        })
    }

    /// Delete a conversation and its messages.
    ///
    /// Returns false if the conversation does not exist for this user.
    pub fn delete(&self, user_id: &str, conversation_id: &str) -> Result<bool, TablerecError> {
        self.db.with_conn(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM conversations WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![conversation_id, user_id],
                )
                .map_err(|e| TablerecError::Storage(format!("Failed to delete: {}", e)))?;
            Ok(deleted > 0)
        })
    }
}

fn ts_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn row_to_message(
    role: &str,
    content: String,
    metadata: Option<String>,
    timestamp: i64,
) -> Result<Message, TablerecError> {
    let role = Role::from_str(role).map_err(TablerecError::Storage)?;
    let metadata = metadata
        .map(|m| serde_json::from_str(&m))
        .transpose()
        .map_err(|e| TablerecError::Storage(format!("Corrupt message metadata: {}", e)))?;
    Ok(Message {
        role,
        content,
        metadata,
        timestamp: ts_to_datetime(timestamp),
    })
}

fn preview_of(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

fn title_of(content: &str) -> String {
    if content.chars().count() > TITLE_CHARS {
        let head: String = content.chars().take(TITLE_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
