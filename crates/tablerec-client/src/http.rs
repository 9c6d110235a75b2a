//! reqwest transport for the Tablerec API.
//!
//! `HttpApi` implements `StatusSource` and `PersistSink`, so it plugs
//! straight into the poller and the controller. Streaming replies are
//! decoded line by line from the SSE body.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;

use tablerec_core::types::{
    Conversation, ConversationSummary, Message, ProcessRequest, ProcessResponse, Role, TaskStatus,
};

use crate::controller::PersistSink;
use crate::error::ClientError;
use crate::poller::StatusSource;
use crate::stream::{parse_sse_line, Fragment};

/// HTTP client for one Tablerec server, scoped to one user.
pub struct HttpApi {
    client: Client,
    base_url: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ConversationsBody {
    conversations: Vec<ConversationSummary>,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: "default".to_string(),
        }
    }

    /// Scope subsequent conversation and preference calls to `user_id`.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Route one message through the process endpoint.
    pub async fn process(&self, request: &ProcessRequest) -> Result<ProcessResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/api/process"))
            .json(request)
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// Route one message through the streaming endpoint.
    ///
    /// Yields parsed fragments; feed the result to `stream::assemble`.
    /// A transport failure mid-body surfaces as an `Err` item so callers
    /// cannot mistake a truncated reply for a complete one.
    pub async fn process_stream(
        &self,
        request: &ProcessRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Fragment, ClientError>> + Send>>, ClientError>
    {
        let response = self
            .client
            .post(self.url("/api/process/stream"))
            .json(request)
            .send()
            .await?;
        let response = check(response).await?;

        let inner: Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>> =
            Box::pin(response.bytes_stream().map(|r| r.map(|b| b.to_vec())));

        let state = SseState {
            inner,
            buffer: String::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        Ok(Box::pin(futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(item) = st.pending.pop_front() {
                    return Some((item, st));
                }
                if st.finished {
                    return None;
                }
                match st.inner.next().await {
                    Some(Ok(chunk)) => {
                        st.buffer.push_str(&String::from_utf8_lossy(&chunk));
                        drain_lines(&mut st.buffer, &mut st.pending);
                    }
                    Some(Err(e)) => {
                        st.finished = true;
                        flush_buffer(&mut st.buffer, &mut st.pending);
                        st.pending.push_back(Err(ClientError::Http(e.to_string())));
                    }
                    None => {
                        st.finished = true;
                        flush_buffer(&mut st.buffer, &mut st.pending);
                    }
                }
            }
        })))
    }

    /// Start a new conversation for this client's user.
    pub async fn create_conversation(
        &self,
        title: Option<&str>,
    ) -> Result<Conversation, ClientError> {
        let response = self
            .client
            .post(self.url("/api/conversations"))
            .json(&serde_json::json!({ "user_id": self.user_id, "title": title }))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch a conversation with its full message history.
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Conversation, ClientError> {
        let response = self
            .client
            .get(self.url(&format!(
                "/api/conversations/{}/{}",
                self.user_id, conversation_id
            )))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// List conversation summaries, most recently updated first.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/conversations/{}", self.user_id)))
            .send()
            .await?;
        let response = check(response).await?;
        let body: ConversationsBody = response.json().await?;
        Ok(body.conversations)
    }
}

struct SseState {
    inner: Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>,
    buffer: String,
    pending: VecDeque<Result<Fragment, ClientError>>,
    finished: bool,
}

/// Split complete lines off `buffer` and parse them into fragments.
fn drain_lines(buffer: &mut String, pending: &mut VecDeque<Result<Fragment, ClientError>>) {
    while let Some(pos) = buffer.find('\n') {
        let line: String = buffer.drain(..=pos).collect();
        if let Some(fragment) = parse_sse_line(&line) {
            pending.push_back(Ok(fragment));
        }
    }
}

/// Parse whatever is left in the buffer once the body ends.
fn flush_buffer(buffer: &mut String, pending: &mut VecDeque<Result<Fragment, ClientError>>) {
    let leftover = std::mem::take(buffer);
    if let Some(fragment) = parse_sse_line(&leftover) {
        pending.push_back(Ok(fragment));
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

fn api_error(status: u16, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.to_string());
    ClientError::Api { status, message }
}

#[async_trait]
impl StatusSource for HttpApi {
    async fn fetch(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/status/{}", task_id)))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PersistSink for HttpApi {
    async fn persist_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/conversations/{}/{}/messages",
                self.user_id, conversation_id
            )))
            .json(&serde_json::json!({
                "role": role.as_str(),
                "content": content,
                "metadata": metadata,
            }))
            .send()
            .await?;
        let response = check(response).await?;
        let _: Message = response.json().await?;
        Ok(())
    }
}
