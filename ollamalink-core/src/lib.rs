//! Ollamalink Core Library
//!
//! Streaming client for the Ollama HTTP API. The service answers either with
//! one complete JSON document or with newline-delimited JSON frames; this
//! crate sends requests, reassembles streamed fragments into a final result,
//! supports cooperative cancellation from a listener, converts in-band error
//! lines into terminal frames instead of failures, and merges conversation
//! state across chat turns. Every raw exchange is recorded in a per-client
//! audit trail for diagnostics.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod trace;

pub use client::{merge, pretty, ChatListener, OllamaClient, StreamListener};
pub use config::ServiceConfig;
pub use error::{ClientError, ClientResult};
pub use protocol::{
    ChatRequest, GenerateRequest, ImagePayload, Message, MessageRole, ModelOptions, ModelSummary,
    ResponseFrame,
};
pub use trace::{Direction, TraceBuffer, TraceEntry};

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
