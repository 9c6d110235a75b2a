//! In-memory transcript mirror of a conversation.
//!
//! Entries are plain text or recommendation cards. Stored history is
//! replayed with `from_messages`, which turns messages tagged with
//! `metadata.type == "recommendation"` back into recommendation entries.

use tablerec_core::types::{Message, RecommendationResult, Role};

/// One rendered transcript entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A plain text message.
    Text { role: Role, content: String },
    /// A recommendation card rendered from a completed task.
    Recommendation {
        content: String,
        result: RecommendationResult,
    },
    /// The in-flight progress row for the active task. Never persisted.
    Pending { progress: u8, message: String },
}

/// The conversation as currently displayed.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a transcript from stored messages.
    pub fn from_messages(messages: &[Message]) -> Self {
        let entries = messages.iter().map(entry_from_message).collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Replace the trailing pending row, or append one if none exists.
    pub fn set_pending(&mut self, progress: u8, message: String) {
        let pending = Entry::Pending { progress, message };
        match self.entries.last_mut() {
            Some(last @ Entry::Pending { .. }) => *last = pending,
            _ => self.entries.push(pending),
        }
    }

    /// Drop the trailing pending row, if present.
    pub fn clear_pending(&mut self) {
        if matches!(self.entries.last(), Some(Entry::Pending { .. })) {
            self.entries.pop();
        }
    }
}

fn entry_from_message(message: &Message) -> Entry {
    if let Some(metadata) = &message.metadata {
        if metadata.get("type").and_then(|t| t.as_str()) == Some("recommendation") {
            if let Some(result) = metadata
                .get("result")
                .and_then(|r| serde_json::from_value::<RecommendationResult>(r.clone()).ok())
            {
                return Entry::Recommendation {
                    content: message.content.clone(),
                    result,
                };
            }
            tracing::warn!("Recommendation metadata did not decode, falling back to text");
        }
    }
    Entry::Text {
        role: message.role,
        content: message.content.clone(),
    }
}

/// Build the metadata attached to a persisted recommendation message.
pub fn recommendation_metadata(result: &RecommendationResult) -> serde_json::Value {
    serde_json::json!({
        "type": "recommendation",
        "result": result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tablerec_core::types::Restaurant;

    fn message(role: Role, content: &str, metadata: Option<serde_json::Value>) -> Message {
        Message {
            role,
            content: content.to_string(),
            metadata,
            timestamp: Utc::now(),
        }
    }

    fn sample_result() -> RecommendationResult {
        RecommendationResult {
            restaurants: vec![Restaurant {
                id: "rest_001".to_string(),
                name: "Din Tai Fung".to_string(),
                cuisine: Some("Taiwanese".to_string()),
                location: None,
                rating: Some(4.5),
                price: Some("$$".to_string()),
                highlights: None,
                reason: None,
                reference: None,
            }],
            thinking_steps: None,
            confidence_score: Some(0.8),
            metadata: None,
        }
    }

    #[test]
    fn test_from_messages_replays_recommendations() {
        let result = sample_result();
        let messages = vec![
            message(Role::User, "spicy food please", None),
            message(
                Role::Assistant,
                "Recommendations ready!",
                Some(recommendation_metadata(&result)),
            ),
        ];

        let transcript = Transcript::from_messages(&messages);

        assert_eq!(transcript.entries().len(), 2);
        match &transcript.entries()[1] {
            Entry::Recommendation { result, .. } => {
                assert_eq!(result.restaurants[0].name, "Din Tai Fung");
            }
            other => panic!("expected recommendation entry, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_metadata_falls_back_to_text() {
        let messages = vec![message(
            Role::Assistant,
            "hello",
            Some(serde_json::json!({ "type": "recommendation", "result": 42 })),
        )];

        let transcript = Transcript::from_messages(&messages);

        assert!(matches!(transcript.entries()[0], Entry::Text { .. }));
    }

    #[test]
    fn test_pending_row_is_replaced_not_stacked() {
        let mut transcript = Transcript::new();
        transcript.push(Entry::Text {
            role: Role::User,
            content: "yes".to_string(),
        });
        transcript.set_pending(10, "Analyzing your requirements...".to_string());
        transcript.set_pending(50, "Searching restaurant database...".to_string());

        assert_eq!(transcript.entries().len(), 2);
        assert!(matches!(
            transcript.entries()[1],
            Entry::Pending { progress: 50, .. }
        ));

        transcript.clear_pending();
        assert_eq!(transcript.entries().len(), 1);
    }
}
