//! Core wire types for the Ollama HTTP API
//!
//! This module contains the data structures exchanged with the service. The
//! design prioritizes:
//! - Type safety for the role enumeration and the frame shape
//! - Forward compatibility: unknown response fields are ignored, extra model
//!   options pass through untouched
//! - One frame type for both endpoints, since the service streams the same
//!   envelope with either a text fragment or a message payload

use crate::error::{ClientError, ClientResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
    /// Tool response (for tool use support)
    Tool,
}

impl MessageRole {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "tool" => Ok(MessageRole::Tool),
            other => Err(ClientError::InvalidRole(other.to_string())),
        }
    }
}

/// An image prepared for transport.
///
/// The wire represents images as base64 text; this type owns that encoding so
/// requests and messages only ever see already-encoded payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload(String);

impl ImagePayload {
    /// Encode raw image bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }

    /// Read and encode an image file.
    pub fn from_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ClientError::Encoding(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_bytes(&bytes))
    }

    /// The base64 text as sent on the wire.
    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// Consume the payload, yielding the base64 text.
    pub fn into_base64(self) -> String {
        self.0
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,

    /// Base64-encoded images, for multimodal models such as llava
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl Message {
    /// Create a text-only message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: None,
        }
    }

    /// Create a message with image attachments, in the given order.
    pub fn with_images(
        role: MessageRole,
        content: impl Into<String>,
        images: Vec<ImagePayload>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            images: Some(images.into_iter().map(ImagePayload::into_base64).collect()),
        }
    }

    /// Create a message from a wire role string.
    ///
    /// Fails with [`ClientError::InvalidRole`] unless the string is one of
    /// `system`, `user`, `assistant`, `tool`.
    pub fn from_role_str(role: &str, content: impl Into<String>) -> ClientResult<Self> {
        Ok(Self::new(role.parse()?, content))
    }
}

/// Model parameters forwarded to the service.
///
/// Common Modelfile parameters get typed fields; anything else passes through
/// the flattened `extra` map untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,

    /// Context window size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,

    /// Any further Modelfile parameter
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn num_predict(mut self, num_predict: i32) -> Self {
        self.num_predict = Some(num_predict);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set an arbitrary Modelfile parameter.
    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Single-prompt completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerateRequest {
    /// Model identifier. Required.
    pub model: String,

    /// The prompt to complete
    pub prompt: String,

    /// Response format hint; the service currently only honors `"json"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Base64-encoded images for multimodal models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    /// System prompt overriding the Modelfile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Full prompt template overriding the Modelfile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Skip prompt templating entirely; no context is returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,

    /// Stream the response as NDJSON frames instead of one object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Conversation context tokens from a previous terminal frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    /// How long the service keeps the model loaded ("5m", "1h", "0", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,

    /// Text expected after the model response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
}

impl GenerateRequest {
    /// Create a request for the given model and prompt.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn context(mut self, context: Vec<i64>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn options(mut self, options: ModelOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Attach an image payload, preserving attachment order.
    pub fn push_image(mut self, image: ImagePayload) -> Self {
        self.images
            .get_or_insert_with(Vec::new)
            .push(image.into_base64());
        self
    }
}

/// Chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatRequest {
    /// Model identifier. Required.
    pub model: String,

    /// Conversation so far, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Tool definitions, if the model supports them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,

    /// Response format hint; the service currently only honors `"json"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Stream the response as NDJSON frames instead of one object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// How long the service keeps the model loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,

    /// Model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
}

impl ChatRequest {
    /// Create a chat request with an empty conversation.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Append a message to the conversation.
    pub fn push_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Append a user message to the conversation.
    pub fn push_user(self, content: impl Into<String>) -> Self {
        self.push_message(Message::new(MessageRole::User, content))
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn options(mut self, options: ModelOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// One decoded unit of a response stream.
///
/// Partial frames (`done == false`) carry only the text fragment or message
/// payload. The terminal frame (`done == true`) additionally carries the
/// statistics fields; they are meaningless on partial frames and deserialize
/// to zero when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResponseFrame {
    /// Model that produced this frame
    #[serde(default)]
    pub model: String,

    /// Creation timestamp as reported by the service (RFC 3339 text)
    #[serde(default)]
    pub created_at: String,

    /// Text fragment (completion endpoint). On the terminal frame returned by
    /// the streaming decoder this holds the full concatenated response.
    #[serde(default)]
    pub response: String,

    /// Chat message carried by this frame (chat endpoint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// Chat messages carried by this frame, for services that batch them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,

    /// Terminal-frame marker
    #[serde(default)]
    pub done: bool,

    /// Total wall time in nanoseconds
    #[serde(default)]
    pub total_duration: u64,

    /// Model load time in nanoseconds
    #[serde(default)]
    pub load_duration: u64,

    /// Number of samples generated
    #[serde(default)]
    pub sample_count: u32,

    /// Sampling time in nanoseconds
    #[serde(default)]
    pub sample_duration: u64,

    /// Number of tokens in the prompt
    #[serde(default)]
    pub prompt_eval_count: u32,

    /// Prompt evaluation time in nanoseconds
    #[serde(default)]
    pub prompt_eval_duration: u64,

    /// Number of tokens in the response
    #[serde(default)]
    pub eval_count: u32,

    /// Response generation time in nanoseconds
    #[serde(default)]
    pub eval_duration: u64,

    /// Conversation context tokens; feed into the next request's `context`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    /// Tool call templates filled in by the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<serde_json::Value>>,
}

impl ResponseFrame {
    /// Synthesize the terminal frame for an in-band error line.
    ///
    /// The service reports errors as regular stream content; the reader
    /// converts such lines into a terminal frame instead of failing the call.
    /// The statistics are fixed sentinels (zero counts, durations of one
    /// nanosecond, a total of three, model `"?"`) so callers can tell a
    /// surfaced protocol error from a genuine completion. The raw line is
    /// carried verbatim in `response`.
    pub fn in_band_error(raw_line: &str) -> Self {
        Self {
            model: "?".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            response: raw_line.to_string(),
            done: true,
            total_duration: 3,
            load_duration: 1,
            sample_count: 0,
            sample_duration: 1,
            prompt_eval_count: 0,
            prompt_eval_duration: 1,
            eval_count: 0,
            eval_duration: 1,
            context: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Whether this frame carries the in-band error sentinels.
    pub fn is_in_band_error(&self) -> bool {
        self.done
            && self.model == "?"
            && self.total_duration == 3
            && self.eval_count == 0
            && self.eval_duration == 1
    }

    /// Generation speed in tokens per second. Meaningful on terminal frames.
    pub fn tokens_per_second(&self) -> f64 {
        1e9 * f64::from(self.eval_count) / self.eval_duration as f64
    }
}

/// One locally available model, as listed by the tags endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model name, e.g. `llama3:latest`
    pub name: String,

    #[serde(default)]
    pub model: String,

    /// Last modification timestamp (RFC 3339 text)
    #[serde(default)]
    pub modified_at: String,

    /// On-disk size in bytes
    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_round_trips_through_wire_names() {
        for role in [
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool,
        ] {
            assert_eq!(role.as_str().parse::<MessageRole>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "moderator".parse::<MessageRole>().unwrap_err();
        assert!(matches!(err, ClientError::InvalidRole(r) if r == "moderator"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let message = Message::new(MessageRole::Assistant, "hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn from_role_str_builds_message() {
        let message = Message::from_role_str("user", "hello").unwrap();
        assert_eq!(message.role, MessageRole::User);
        assert!(Message::from_role_str("robot", "hello").is_err());
    }

    #[test]
    fn image_payload_encodes_base64() {
        let payload = ImagePayload::from_bytes(b"png-bytes");
        assert_eq!(payload.as_base64(), "cG5nLWJ5dGVz");
    }

    #[test]
    fn image_payload_from_missing_file_is_encoding_error() {
        let err = ImagePayload::from_file("/no/such/image.png").unwrap_err();
        assert!(matches!(err, ClientError::Encoding(_)));
    }

    #[test]
    fn message_with_images_keeps_order() {
        let message = Message::with_images(
            MessageRole::User,
            "what is this?",
            vec![
                ImagePayload::from_bytes(b"first"),
                ImagePayload::from_bytes(b"second"),
            ],
        );
        let images = message.images.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0], ImagePayload::from_bytes(b"first").into_base64());
    }

    #[test]
    fn optional_request_fields_are_omitted() {
        let request = GenerateRequest::new("llama3", "hi");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, json!({"model": "llama3", "prompt": "hi"}));
    }

    #[test]
    fn model_options_flatten_extra_parameters() {
        let options = ModelOptions::new()
            .temperature(0.2)
            .extra("mirostat", json!(2));
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["temperature"], json!(0.2));
        assert_eq!(json["mirostat"], json!(2));
    }

    #[test]
    fn chat_request_push_user_appends() {
        let request = ChatRequest::new("llama3")
            .push_message(Message::new(MessageRole::System, "be terse"))
            .push_user("hi");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].role, MessageRole::User);
    }

    #[test]
    fn frame_tolerates_unknown_fields() {
        let frame: ResponseFrame = serde_json::from_str(
            r#"{"model":"llama3","response":"x","done":false,"never_seen_before":42}"#,
        )
        .unwrap();
        assert_eq!(frame.response, "x");
        assert!(!frame.done);
    }

    #[test]
    fn terminal_frame_carries_statistics() {
        let frame: ResponseFrame = serde_json::from_str(
            r#"{"model":"llama3","response":"","done":true,"total_duration":100,"eval_count":7,"eval_duration":1000000000}"#,
        )
        .unwrap();
        assert!(frame.done);
        assert_eq!(frame.total_duration, 100);
        assert_eq!(frame.tokens_per_second(), 7.0);
    }

    #[test]
    fn in_band_error_frame_is_recognizable() {
        let frame = ResponseFrame::in_band_error(r#"{"error":"model not found"}"#);
        assert!(frame.done);
        assert!(frame.is_in_band_error());
        assert_eq!(frame.response, r#"{"error":"model not found"}"#);
        assert_eq!(frame.total_duration, 3);
        assert_eq!(frame.eval_duration, 1);
        assert_eq!(frame.context.as_deref(), Some(&[][..]));
    }

    #[test]
    fn genuine_completion_is_not_flagged_as_error() {
        let frame: ResponseFrame = serde_json::from_str(
            r#"{"model":"llama3","response":"","done":true,"total_duration":100}"#,
        )
        .unwrap();
        assert!(!frame.is_in_band_error());
    }
}
