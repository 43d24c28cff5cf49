//! Protocol module for the request/response wire model
//!
//! These structures mirror the service's JSON bodies one to one. They are
//! plain data: the reader state machines in [`crate::client`] hold all
//! protocol behavior.

pub mod types;

pub use types::{
    ChatRequest, GenerateRequest, ImagePayload, Message, MessageRole, ModelOptions, ModelSummary,
    ResponseFrame,
};
