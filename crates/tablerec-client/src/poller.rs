//! Background-task status polling.
//!
//! A poller fetches `TaskStatus` snapshots at a fixed interval until the
//! first terminal observation, which is emitted exactly once before the
//! loop stops. Transient fetch errors are logged and polling continues.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tablerec_core::types::{TaskState, TaskStatus};

use crate::error::ClientError;

/// Source of task status snapshots, usually the HTTP API.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, task_id: &str) -> Result<TaskStatus, ClientError>;
}

/// Events emitted by a running poller.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A non-terminal snapshot; progress and message updated.
    Progress(TaskStatus),
    /// The task finished with a result. Emitted once, then polling stops.
    Completed(TaskStatus),
    /// The task failed. Emitted once, then polling stops.
    Failed(TaskStatus),
}

impl PollEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollEvent::Completed(_) | PollEvent::Failed(_))
    }
}

/// Handle to a spawned polling loop.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the polling loop. No further events are emitted.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Polls a task at a fixed interval until it reaches a terminal state.
pub struct TaskPoller {
    interval: Duration,
}

impl Default for TaskPoller {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl TaskPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Spawn the polling loop for `task_id`.
    ///
    /// Events are delivered on `events`; the loop also stops when the
    /// receiving side is dropped.
    pub fn spawn(
        &self,
        source: Arc<dyn StatusSource>,
        task_id: String,
        events: mpsc::UnboundedSender<PollEvent>,
    ) -> PollerHandle {
        let interval = self.interval;
        let task = tokio::spawn(async move {
            loop {
                match source.fetch(&task_id).await {
                    Ok(status) => {
                        let event = match status.status {
                            TaskState::Error => PollEvent::Failed(status),
                            state if state.is_terminal() => PollEvent::Completed(status),
                            _ => PollEvent::Progress(status),
                        };
                        let terminal = event.is_terminal();
                        if events.send(event).is_err() {
                            break;
                        }
                        if terminal {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(task_id = %task_id, error = %e, "Status fetch failed, retrying");
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });
        PollerHandle { task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tablerec_core::types::{RecommendationResult, TaskState};

    /// Replays a scripted sequence of fetch results, then repeats the last.
    struct ScriptedSource {
        script: Mutex<Vec<Result<TaskStatus, ClientError>>>,
        fetches: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<TaskStatus, ClientError>>) -> Self {
            Self {
                script: Mutex::new(script),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone_entry()
            };
            let _ = task_id;
            next
        }
    }

    trait CloneEntry {
        fn clone_entry(&self) -> Result<TaskStatus, ClientError>;
    }

    impl CloneEntry for Result<TaskStatus, ClientError> {
        fn clone_entry(&self) -> Result<TaskStatus, ClientError> {
            match self {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(ClientError::Http(e.to_string())),
            }
        }
    }

    fn status(state: TaskState, progress: u8) -> TaskStatus {
        TaskStatus {
            task_id: "t1".to_string(),
            status: state,
            progress,
            message: "working".to_string(),
            result: match state {
                TaskState::Completed => Some(RecommendationResult {
                    restaurants: vec![],
                    thinking_steps: None,
                    confidence_score: None,
                    metadata: None,
                }),
                _ => None,
            },
            error: match state {
                TaskState::Error => Some("boom".to_string()),
                _ => None,
            },
        }
    }

    #[tokio::test]
    async fn test_terminal_emitted_once_then_stops() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(status(TaskState::Processing, 50)),
            Ok(status(TaskState::Completed, 100)),
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle =
            TaskPoller::new(Duration::from_millis(1)).spawn(source.clone(), "t1".into(), tx);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, PollEvent::Progress(_)));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, PollEvent::Completed(_)));

        // Channel closes and no further fetches happen after terminal.
        assert!(rx.recv().await.is_none());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.fetch_count(), 2);
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_failure_maps_to_failed_event() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(status(TaskState::Error, 50))]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        TaskPoller::new(Duration::from_millis(1)).spawn(source, "t1".into(), tx);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PollEvent::Failed(_)));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_error_state_without_message_still_fails() {
        let mut snapshot = status(TaskState::Error, 50);
        snapshot.error = None;
        let source = Arc::new(ScriptedSource::new(vec![Ok(snapshot)]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        TaskPoller::new(Duration::from_millis(1)).spawn(source, "t1".into(), tx);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PollEvent::Failed(_)));
    }

    #[tokio::test]
    async fn test_transient_errors_keep_polling() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(ClientError::Http("connection refused".to_string())),
            Err(ClientError::Http("connection refused".to_string())),
            Ok(status(TaskState::Completed, 100)),
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        TaskPoller::new(Duration::from_millis(1)).spawn(source.clone(), "t1".into(), tx);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PollEvent::Completed(_)));
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_cancel_stops_the_loop() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(status(
            TaskState::Processing,
            10,
        ))]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle =
            TaskPoller::new(Duration::from_millis(1)).spawn(source.clone(), "t1".into(), tx);

        // Let it make a few fetches, then cancel.
        let _ = rx.recv().await.unwrap();
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_cancel = source.fetch_count();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.fetch_count(), after_cancel);
    }
}
