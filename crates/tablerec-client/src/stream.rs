//! SSE fragment parsing and streaming reply assembly.
//!
//! The server streams a reply as `data:` lines carrying JSON fragments:
//! `{"content": "..."}` pieces, an optional `{"error": ..., "content": ...}`
//! fallback, and a final `{"done": true}` marker. The assembler folds a
//! fragment stream into exactly one assistant message on a `ReplySink`.
//! Transport failures arrive as `Err` items and abort the assembly after
//! the sink is left consistent.

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::ClientError;

/// One parsed piece of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A chunk of reply text, appended in arrival order.
    Content(String),
    /// The server failed mid-stream; `content` is the user-facing fallback.
    Error { error: String, content: String },
    /// End of the reply.
    Done,
}

#[derive(Deserialize)]
struct RawFragment {
    content: Option<String>,
    error: Option<String>,
    done: Option<bool>,
}

/// Parse one SSE line into a fragment.
///
/// Returns `None` for blank lines, comments, and lines that are not
/// `data:` payloads in the expected shape.
pub fn parse_sse_line(line: &str) -> Option<Fragment> {
    let line = line.trim();
    let payload = line.strip_prefix("data:")?.trim_start();
    let raw: RawFragment = serde_json::from_str(payload).ok()?;

    if raw.done.unwrap_or(false) {
        return Some(Fragment::Done);
    }
    if let Some(error) = raw.error {
        return Some(Fragment::Error {
            error,
            content: raw.content.unwrap_or_default(),
        });
    }
    raw.content.map(Fragment::Content)
}

/// Where assembled reply text lands, one message per stream.
///
/// `begin` is called exactly once per stream, on the first fragment (or on
/// `done` when the stream carried no content at all). Subsequent fragments
/// arrive via `append`.
pub trait ReplySink {
    fn begin(&mut self, content: &str);
    fn append(&mut self, content: &str);
}

/// A fully assembled reply.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledReply {
    /// The complete reply text, in arrival order.
    pub text: String,
    /// Set when the server reported an error mid-stream.
    pub error: Option<String>,
}

/// Fold a fragment stream into a single message on `sink`.
///
/// The sink always ends up with exactly one message, even when the stream
/// closes without any content or without a done marker. A transport error
/// (`Err` item) returns `Err` after the sink is left consistent; content
/// appended before the failure stays in place.
pub async fn assemble<S>(
    mut fragments: S,
    sink: &mut dyn ReplySink,
) -> Result<AssembledReply, ClientError>
where
    S: Stream<Item = Result<Fragment, ClientError>> + Unpin,
{
    let mut began = false;
    let mut text = String::new();
    let mut error = None;

    while let Some(item) = fragments.next().await {
        let fragment = match item {
            Ok(fragment) => fragment,
            Err(e) => {
                tracing::warn!(error = %e, "Reply stream failed mid-transfer");
                if !began {
                    sink.begin("");
                }
                return Err(e);
            }
        };
        match fragment {
            Fragment::Content(chunk) => {
                if began {
                    sink.append(&chunk);
                } else {
                    sink.begin(&chunk);
                    began = true;
                }
                text.push_str(&chunk);
            }
            Fragment::Error {
                error: code,
                content,
            } => {
                tracing::warn!(error = %code, "Server reported a streaming error");
                if began {
                    sink.append(&content);
                } else {
                    sink.begin(&content);
                    began = true;
                }
                text.push_str(&content);
                error = Some(code);
            }
            Fragment::Done => break,
        }
    }

    if !began {
        sink.begin("");
    }

    Ok(AssembledReply { text, error })
}
