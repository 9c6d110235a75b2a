//! Background task registry.
//!
//! Tracks recommendation tasks through pending -> processing ->
//! completed | error. Progress is monotonic non-decreasing, and a task
//! never leaves a terminal state. Snapshots are cheap clones served to
//! the status endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;
use uuid::Uuid;

use tablerec_core::types::{RecommendationResult, TaskState, TaskStatus};

#[derive(Debug, Clone)]
struct TaskEntry {
    status: TaskState,
    progress: u8,
    message: String,
    result: Option<RecommendationResult>,
    error: Option<String>,
}

/// Shared registry of background recommendation tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<Mutex<HashMap<String, TaskEntry>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending task and return its id.
    pub fn create(&self) -> String {
        let task_id = Uuid::new_v4().to_string();
        if let Ok(mut tasks) = self.inner.lock() {
            tasks.insert(
                task_id.clone(),
                TaskEntry {
                    status: TaskState::Pending,
                    progress: 0,
                    message: "Task created".to_string(),
                    result: None,
                    error: None,
                },
            );
        }
        task_id
    }

    /// Record a processing progress update.
    ///
    /// Ignored for unknown ids and for tasks already in a terminal state.
    /// Progress never decreases.
    pub fn update_progress(&self, task_id: &str, progress: u8, message: &str) {
        let Ok(mut tasks) = self.inner.lock() else {
            warn!(task_id, "Task registry lock poisoned");
            return;
        };
        if let Some(entry) = tasks.get_mut(task_id) {
            if entry.status.is_terminal() {
                return;
            }
            entry.status = TaskState::Processing;
            entry.progress = entry.progress.max(progress);
            entry.message = message.to_string();
        }
    }

    /// Flip a task to completed with its result. No-op once terminal.
    pub fn complete(&self, task_id: &str, result: RecommendationResult) {
        let Ok(mut tasks) = self.inner.lock() else {
            warn!(task_id, "Task registry lock poisoned");
            return;
        };
        if let Some(entry) = tasks.get_mut(task_id) {
            if entry.status.is_terminal() {
                return;
            }
            entry.status = TaskState::Completed;
            entry.progress = 100;
            entry.message = "Recommendations ready!".to_string();
            entry.result = Some(result);
        }
    }

    /// Flip a task to the error state. No-op once terminal.
    pub fn fail(&self, task_id: &str, error: &str) {
        let Ok(mut tasks) = self.inner.lock() else {
            warn!(task_id, "Task registry lock poisoned");
            return;
        };
        if let Some(entry) = tasks.get_mut(task_id) {
            if entry.status.is_terminal() {
                return;
            }
            entry.status = TaskState::Error;
            entry.message = format!("Error: {}", error);
            entry.error = Some(error.to_string());
        }
    }

    /// Snapshot a task's current status. Unknown ids return `None`.
    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        let tasks = self.inner.lock().ok()?;
        tasks.get(task_id).map(|entry| TaskStatus {
            task_id: task_id.to_string(),
            status: entry.status,
            progress: entry.progress,
            message: entry.message.clone(),
            result: entry.result.clone(),
            error: entry.error.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_result() -> RecommendationResult {
        RecommendationResult {
            restaurants: vec![],
            thinking_steps: None,
            confidence_score: None,
            metadata: None,
        }
    }

    #[test]
    fn test_create_is_pending() {
        let registry = TaskRegistry::new();
        let id = registry.create();
        let status = registry.status(&id).unwrap();
        assert_eq!(status.status, TaskState::Pending);
        assert_eq!(status.progress, 0);
        assert_eq!(status.message, "Task created");
    }

    #[test]
    fn test_unknown_id_is_none() {
        let registry = TaskRegistry::new();
        assert!(registry.status("nope").is_none());
    }

    #[test]
    fn test_progress_updates() {
        let registry = TaskRegistry::new();
        let id = registry.create();
        registry.update_progress(&id, 30, "Extracting preferences...");

        let status = registry.status(&id).unwrap();
        assert_eq!(status.status, TaskState::Processing);
        assert_eq!(status.progress, 30);
        assert_eq!(status.message, "Extracting preferences...");
    }

    #[test]
    fn test_progress_is_monotonic() {
        let registry = TaskRegistry::new();
        let id = registry.create();
        registry.update_progress(&id, 70, "Applying filters...");
        registry.update_progress(&id, 30, "Extracting preferences...");

        let status = registry.status(&id).unwrap();
        assert_eq!(status.progress, 70);
    }

    #[test]
    fn test_complete() {
        let registry = TaskRegistry::new();
        let id = registry.create();
        registry.complete(&id, empty_result());

        let status = registry.status(&id).unwrap();
        assert_eq!(status.status, TaskState::Completed);
        assert_eq!(status.progress, 100);
        assert_eq!(status.message, "Recommendations ready!");
        assert!(status.result.is_some());
        assert!(status.error.is_none());
    }

    #[test]
    fn test_fail() {
        let registry = TaskRegistry::new();
        let id = registry.create();
        registry.fail(&id, "catalog unavailable");

        let status = registry.status(&id).unwrap();
        assert_eq!(status.status, TaskState::Error);
        assert_eq!(status.message, "Error: catalog unavailable");
        assert_eq!(status.error.as_deref(), Some("catalog unavailable"));
    }

    #[test]
    fn test_terminal_state_is_never_overwritten() {
        let registry = TaskRegistry::new();
        let id = registry.create();
        registry.complete(&id, empty_result());

        registry.update_progress(&id, 10, "late update");
        registry.fail(&id, "late failure");

        let status = registry.status(&id).unwrap();
        assert_eq!(status.status, TaskState::Completed);
        assert_eq!(status.progress, 100);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_registry_clones_share_state() {
        let registry = TaskRegistry::new();
        let clone = registry.clone();
        let id = registry.create();
        clone.update_progress(&id, 50, "Searching restaurant database...");
        assert_eq!(registry.status(&id).unwrap().progress, 50);
    }
}
