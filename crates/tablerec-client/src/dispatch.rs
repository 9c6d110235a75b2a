//! Maps a process response to exactly one client action.

use tablerec_core::types::{
    ConfirmationRequest, ProcessResponse, RecommendationResult, ThinkingStep,
};

use crate::error::ClientError;

const TASK_ID_PREFIX: &str = "Task ID: ";

/// The single action a process response asks the client to take.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Render the reply text as an assistant message.
    Reply(String),
    /// Show the confirmation prompt and wait for yes/no/modify.
    Confirmation(ConfirmationRequest),
    /// A background task started; begin polling its status.
    Task {
        task_id: String,
        steps: Vec<ThinkingStep>,
    },
    /// Inline recommendations, rendered directly.
    Results(RecommendationResult),
}

impl Dispatch {
    /// Map a response to exactly one dispatch.
    ///
    /// Responses populating zero fields, or more than one, are malformed.
    pub fn from_response(response: ProcessResponse) -> Result<Dispatch, ClientError> {
        let populated = usize::from(response.reply.is_some())
            + usize::from(response.confirmation_request.is_some())
            + usize::from(response.thinking_steps.is_some())
            + usize::from(response.result.is_some());
        if populated != 1 {
            return Err(ClientError::Decode(format!(
                "Expected exactly one response field, got {}",
                populated
            )));
        }

        if let Some(reply) = response.reply {
            return Ok(Dispatch::Reply(reply));
        }
        if let Some(confirmation) = response.confirmation_request {
            return Ok(Dispatch::Confirmation(confirmation));
        }
        if let Some(result) = response.result {
            return Ok(Dispatch::Results(result));
        }

        let steps = response
            .thinking_steps
            .unwrap_or_default();
        let task_id = steps
            .iter()
            .filter_map(|s| s.details.as_deref())
            .find_map(|d| d.strip_prefix(TASK_ID_PREFIX))
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::Decode("Thinking steps carry no task id".to_string())
            })?;

        Ok(Dispatch::Task { task_id, steps })
    }
}
