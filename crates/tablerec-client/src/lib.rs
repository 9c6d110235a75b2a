//! Client-side building blocks for Tablerec front-ends.
//!
//! Provides the HTTP transport, SSE fragment parsing and reply assembly,
//! background-task status polling, response dispatch, and an in-memory
//! transcript mirror. UI layers plug in via the `ReplySink`, `StatusSource`,
//! and `PersistSink` traits.

pub mod controller;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod poller;
pub mod stream;
pub mod transcript;

pub use controller::{ChatController, PersistSink};
pub use dispatch::Dispatch;
pub use error::ClientError;
pub use http::HttpApi;
pub use poller::{PollEvent, PollerHandle, StatusSource, TaskPoller};
pub use stream::{assemble, parse_sse_line, AssembledReply, Fragment, ReplySink};
pub use transcript::{Entry, Transcript};
