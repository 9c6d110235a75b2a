//! Conversation controller: one active task, dispatch handling, and
//! server-side persistence of assistant output.
//!
//! Persistence failures are logged at warn and never roll back displayed
//! state; the server record wins on the next history load.

use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tablerec_core::types::Role;

use crate::dispatch::Dispatch;
use crate::error::ClientError;
use crate::poller::{PollEvent, PollerHandle, StatusSource, TaskPoller};
use crate::stream::{assemble, AssembledReply, Fragment, ReplySink};
use crate::transcript::recommendation_metadata;

/// Writes assistant messages back to the server, usually the HTTP API.
#[async_trait]
pub trait PersistSink: Send + Sync {
    async fn persist_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), ClientError>;
}

struct ActiveTask {
    task_id: String,
    poller: PollerHandle,
    forwarder: JoinHandle<()>,
}

/// Owns the single active background task for one conversation view.
///
/// Starting a new task cancels the previous poller rather than queueing
/// behind it.
pub struct ChatController {
    status: Arc<dyn StatusSource>,
    persist: Arc<dyn PersistSink>,
    poller: TaskPoller,
    active: Option<ActiveTask>,
}

impl ChatController {
    pub fn new(
        status: Arc<dyn StatusSource>,
        persist: Arc<dyn PersistSink>,
        poller: TaskPoller,
    ) -> Self {
        Self {
            status,
            persist,
            poller,
            active: None,
        }
    }

    /// The task currently being polled, if any.
    pub fn active_task_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.task_id.as_str())
    }

    /// Stop polling the active task without persisting anything.
    pub fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.poller.cancel();
            active.forwarder.abort();
        }
    }

    /// Act on one dispatched response.
    ///
    /// Reply, confirmation, and inline results are persisted immediately.
    /// A task dispatch starts polling; progress and the terminal event are
    /// forwarded to `events`, and the terminal snapshot is persisted
    /// exactly once.
    pub async fn handle_dispatch(
        &mut self,
        conversation_id: &str,
        dispatch: Dispatch,
        events: mpsc::UnboundedSender<PollEvent>,
    ) {
        match dispatch {
            Dispatch::Reply(text) => {
                self.persist_warn_only(conversation_id, &text, None).await;
            }
            Dispatch::Confirmation(request) => {
                self.persist_warn_only(conversation_id, &request.message, None)
                    .await;
            }
            Dispatch::Results(result) => {
                let metadata = recommendation_metadata(&result);
                self.persist_warn_only(conversation_id, "Recommendations ready!", Some(metadata))
                    .await;
            }
            Dispatch::Task { task_id, .. } => {
                self.start_task(conversation_id, task_id, events);
            }
        }
    }

    /// Stream a reply into `sink`, then persist the assembled text once.
    ///
    /// The persistence call fires on completion (the done marker or end of
    /// stream). A transport error propagates as `Err` and persists
    /// nothing; content already shown through the sink stays in place.
    pub async fn handle_stream<S>(
        &self,
        conversation_id: &str,
        fragments: S,
        sink: &mut dyn ReplySink,
    ) -> Result<AssembledReply, ClientError>
    where
        S: Stream<Item = Result<Fragment, ClientError>> + Unpin,
    {
        let reply = assemble(fragments, sink).await?;
        self.persist_warn_only(conversation_id, &reply.text, None)
            .await;
        Ok(reply)
    }

    fn start_task(
        &mut self,
        conversation_id: &str,
        task_id: String,
        events: mpsc::UnboundedSender<PollEvent>,
    ) {
        self.cancel_active();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = self
            .poller
            .spawn(self.status.clone(), task_id.clone(), tx);

        let persist = self.persist.clone();
        let conversation_id = conversation_id.to_string();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let terminal = event.is_terminal();
                match &event {
                    PollEvent::Completed(status) => {
                        let metadata = status.result.as_ref().map(recommendation_metadata);
                        if let Err(e) = persist
                            .persist_message(
                                &conversation_id,
                                Role::Assistant,
                                &status.message,
                                metadata,
                            )
                            .await
                        {
                            tracing::warn!(error = %e, "Failed to persist recommendation message");
                        }
                    }
                    PollEvent::Failed(status) => {
                        let content = status.error.as_deref().unwrap_or(&status.message);
                        if let Err(e) = persist
                            .persist_message(&conversation_id, Role::Assistant, content, None)
                            .await
                        {
                            tracing::warn!(error = %e, "Failed to persist task failure message");
                        }
                    }
                    PollEvent::Progress(_) => {}
                }
                if events.send(event).is_err() {
                    break;
                }
                if terminal {
                    break;
                }
            }
        });

        self.active = Some(ActiveTask {
            task_id,
            poller,
            forwarder,
        });
    }

    async fn persist_warn_only(
        &self,
        conversation_id: &str,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) {
        if let Err(e) = self
            .persist
            .persist_message(conversation_id, Role::Assistant, content, metadata)
            .await
        {
            tracing::warn!(error = %e, "Failed to persist assistant message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tablerec_core::types::{
        ConfirmationRequest, Preferences, RecommendationResult, TaskState, TaskStatus,
    };

    /// Status source answering per task id from a fixed map.
    struct MapSource {
        by_task: HashMap<String, TaskStatus>,
        fetches: AtomicUsize,
    }

    impl MapSource {
        fn new(entries: Vec<TaskStatus>) -> Self {
            Self {
                by_task: entries
                    .into_iter()
                    .map(|s| (s.task_id.clone(), s))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusSource for MapSource {
        async fn fetch(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.by_task
                .get(task_id)
                .cloned()
                .ok_or_else(|| ClientError::Api {
                    status: 404,
                    message: format!("Task not found: {}", task_id),
                })
        }
    }

    #[derive(Default)]
    struct RecordingPersist {
        messages: Mutex<Vec<(String, String, Option<serde_json::Value>)>>,
        fail: bool,
    }

    #[async_trait]
    impl PersistSink for RecordingPersist {
        async fn persist_message(
            &self,
            conversation_id: &str,
            _role: Role,
            content: &str,
            metadata: Option<serde_json::Value>,
        ) -> Result<(), ClientError> {
            self.messages.lock().unwrap().push((
                conversation_id.to_string(),
                content.to_string(),
                metadata,
            ));
            if self.fail {
                return Err(ClientError::Persist("db unavailable".to_string()));
            }
            Ok(())
        }
    }

    fn completed(task_id: &str) -> TaskStatus {
        TaskStatus {
            task_id: task_id.to_string(),
            status: TaskState::Completed,
            progress: 100,
            message: "Recommendations ready!".to_string(),
            result: Some(RecommendationResult {
                restaurants: vec![],
                thinking_steps: None,
                confidence_score: Some(0.5),
                metadata: None,
            }),
            error: None,
        }
    }

    fn processing(task_id: &str) -> TaskStatus {
        TaskStatus {
            task_id: task_id.to_string(),
            status: TaskState::Processing,
            progress: 30,
            message: "Extracting preferences...".to_string(),
            result: None,
            error: None,
        }
    }

    fn make_controller(
        source: Arc<MapSource>,
        persist: Arc<RecordingPersist>,
    ) -> ChatController {
        ChatController::new(
            source,
            persist,
            TaskPoller::new(Duration::from_millis(1)),
        )
    }

    fn task_dispatch(task_id: &str) -> Dispatch {
        Dispatch::Task {
            task_id: task_id.to_string(),
            steps: vec![],
        }
    }

    #[tokio::test]
    async fn test_completed_task_persists_exactly_once() {
        let source = Arc::new(MapSource::new(vec![completed("t1")]));
        let persist = Arc::new(RecordingPersist::default());
        let mut controller = make_controller(source, persist.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        controller.handle_dispatch("conv1", task_dispatch("t1"), tx).await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PollEvent::Completed(_)));
        assert!(rx.recv().await.is_none());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let messages = persist.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, "Recommendations ready!");
        let metadata = messages[0].2.as_ref().unwrap();
        assert_eq!(metadata["type"], "recommendation");
    }

    #[tokio::test]
    async fn test_new_task_cancels_previous_poller() {
        let source = Arc::new(MapSource::new(vec![processing("a"), completed("b")]));
        let persist = Arc::new(RecordingPersist::default());
        let mut controller = make_controller(source.clone(), persist.clone());

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        controller.handle_dispatch("conv1", task_dispatch("a"), tx_a).await;
        let _ = rx_a.recv().await.unwrap();
        assert_eq!(controller.active_task_id(), Some("a"));

        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        controller.handle_dispatch("conv1", task_dispatch("b"), tx_b).await;
        assert_eq!(controller.active_task_id(), Some("b"));

        let event = rx_b.recv().await.unwrap();
        assert!(matches!(event, PollEvent::Completed(_)));

        // Task a's poller is cancelled; its channel yields nothing more
        // and the fetch count stops moving.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let settled = source.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), settled);

        let messages = persist.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_persists_without_polling() {
        let source = Arc::new(MapSource::new(vec![]));
        let persist = Arc::new(RecordingPersist::default());
        let mut controller = make_controller(source.clone(), persist.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        let dispatch = Dispatch::Confirmation(ConfirmationRequest {
            message: "Is this correct?".to_string(),
            preferences: Preferences::default(),
            needs_confirmation: true,
        });
        controller.handle_dispatch("conv1", dispatch, tx).await;

        assert!(controller.active_task_id().is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(persist.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_is_non_fatal() {
        let source = Arc::new(MapSource::new(vec![completed("t1")]));
        let persist = Arc::new(RecordingPersist {
            messages: Mutex::new(vec![]),
            fail: true,
        });
        let mut controller = make_controller(source, persist.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        controller.handle_dispatch("conv1", task_dispatch("t1"), tx).await;

        // The terminal event still reaches the UI despite the failed write.
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PollEvent::Completed(_)));
        assert_eq!(persist.messages.lock().unwrap().len(), 1);
    }

    #[derive(Default)]
    struct CollectingSink {
        messages: Vec<String>,
    }

    impl ReplySink for CollectingSink {
        fn begin(&mut self, content: &str) {
            self.messages.push(content.to_string());
        }

        fn append(&mut self, content: &str) {
            if let Some(last) = self.messages.last_mut() {
                last.push_str(content);
            }
        }
    }

    #[tokio::test]
    async fn test_streamed_reply_persists_once_on_done() {
        let source = Arc::new(MapSource::new(vec![]));
        let persist = Arc::new(RecordingPersist::default());
        let controller = make_controller(source, persist.clone());
        let mut sink = CollectingSink::default();

        let fragments = futures::stream::iter(vec![
            Ok(Fragment::Content("Hello".to_string())),
            Ok(Fragment::Content(" world".to_string())),
            Ok(Fragment::Done),
        ]);
        let reply = controller
            .handle_stream("conv1", fragments, &mut sink)
            .await
            .unwrap();

        assert_eq!(reply.text, "Hello world");
        assert_eq!(sink.messages, vec!["Hello world".to_string()]);
        let messages = persist.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, "Hello world");
    }

    #[tokio::test]
    async fn test_streamed_transport_error_persists_nothing() {
        let source = Arc::new(MapSource::new(vec![]));
        let persist = Arc::new(RecordingPersist::default());
        let controller = make_controller(source, persist.clone());
        let mut sink = CollectingSink::default();

        let fragments = futures::stream::iter(vec![
            Ok(Fragment::Content("Hel".to_string())),
            Err(ClientError::Http("connection reset".to_string())),
        ]);
        let result = controller.handle_stream("conv1", fragments, &mut sink).await;

        assert!(matches!(result, Err(ClientError::Http(_))));
        // Shown content stays; nothing reaches the server.
        assert_eq!(sink.messages, vec!["Hel".to_string()]);
        assert!(persist.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply_dispatch_persists_text() {
        let source = Arc::new(MapSource::new(vec![]));
        let persist = Arc::new(RecordingPersist::default());
        let mut controller = make_controller(source, persist.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        controller
            .handle_dispatch("conv1", Dispatch::Reply("Hi there!".to_string()), tx)
            .await;

        let messages = persist.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, "Hi there!");
        assert!(messages[0].2.is_none());
    }
}
