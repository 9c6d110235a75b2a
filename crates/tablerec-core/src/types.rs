//! Shared data model: restaurants, preferences, task snapshots, conversation
//! records, and the wire shapes of the process endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A restaurant as presented to the user.
///
/// Everything beyond the name is optional; the display layer renders
/// whatever fields are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Price bucket: `$` through `$$$$`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Status of a single thinking step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingStatus {
    Thinking,
    Completed,
    Error,
}

/// One step of the engine's visible reasoning trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingStep {
    pub step: String,
    pub description: String,
    pub status: ThinkingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ThinkingStep {
    pub fn completed(step: &str, description: &str, details: &str) -> Self {
        Self {
            step: step.to_string(),
            description: description.to_string(),
            status: ThinkingStatus::Completed,
            details: Some(details.to_string()),
        }
    }

    pub fn thinking(step: &str, description: &str, details: &str) -> Self {
        Self {
            step: step.to_string(),
            description: description.to_string(),
            status: ThinkingStatus::Thinking,
            details: Some(details.to_string()),
        }
    }
}

/// The final payload of a recommendation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub restaurants: Vec<Restaurant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_steps: Option<Vec<ThinkingStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A budget range in a currency, per person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    pub currency: String,
    pub per: String,
}

impl Default for BudgetRange {
    fn default() -> Self {
        Self {
            min: Some(20),
            max: Some(60),
            currency: "SGD".to_string(),
            per: "person".to_string(),
        }
    }
}

/// Dining preferences extracted from a query or stored per user.
///
/// The string `"any"` marks a facet the user has not constrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub restaurant_types: Vec<String>,
    pub flavor_profiles: Vec<String>,
    pub dining_purpose: String,
    pub budget_range: BudgetRange,
    pub location: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            restaurant_types: vec!["any".to_string()],
            flavor_profiles: vec!["any".to_string()],
            dining_purpose: "any".to_string(),
            budget_range: BudgetRange::default(),
            location: "any".to_string(),
        }
    }
}

impl Preferences {
    /// Whether the restaurant-types facet carries a concrete value.
    pub fn has_types(&self) -> bool {
        !self.restaurant_types.is_empty() && self.restaurant_types[0] != "any"
    }

    /// Whether the flavor-profiles facet carries a concrete value.
    pub fn has_flavors(&self) -> bool {
        !self.flavor_profiles.is_empty() && self.flavor_profiles[0] != "any"
    }

    pub fn has_purpose(&self) -> bool {
        self.dining_purpose != "any"
    }

    pub fn has_location(&self) -> bool {
        self.location != "any"
    }
}

/// A request for the user to confirm extracted preferences before the
/// engine starts a recommendation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub message: String,
    pub preferences: Preferences,
    pub needs_confirmation: bool,
}

/// Lifecycle state of a background recommendation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Processing,
    Completed,
    Error,
}

impl TaskState {
    /// Terminal states are never left once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Error)
    }
}

/// A point-in-time snapshot of a background task, as served by the status
/// endpoint and consumed by the polling client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub status: TaskState,
    /// 0-100, non-decreasing until terminal.
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RecommendationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A single message within a conversation.
///
/// `metadata` is an open JSON bag. Recommendation messages store the full
/// result payload under `{"type": "recommendation", ...}` so history can
/// replay them as cards rather than text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// A full conversation record with its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub model: String,
    pub last_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// A conversation listing entry without message bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub model: String,
    pub last_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Request body for the process endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub query: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub conversation_history: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<String>,
}

fn default_user_id() -> String {
    "default".to_string()
}

/// Response body for the process endpoint.
///
/// Exactly one of the optional fields is populated per response:
/// `reply`, `confirmation_request`, `thinking_steps`, or `result`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_request: Option<ConfirmationRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_steps: Option<Vec<ThinkingStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RecommendationResult>,
}
