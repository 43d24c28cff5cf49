//! The Ollama client
//!
//! [`OllamaClient`] drives request/response exchanges against one service
//! instance. Each call runs on the caller's task and suspends only at I/O
//! boundaries; multiple calls may run concurrently against the same client,
//! which shares nothing mutable between them except the audit trail.

pub mod listener;
pub mod streaming;

pub use listener::{ChatListener, StreamListener};
pub use streaming::{LineSource, NdjsonLines};

use crate::config::ServiceConfig;
use crate::error::{ClientError, ClientResult};
use crate::protocol::{ChatRequest, GenerateRequest, ModelSummary, ResponseFrame};
use crate::trace::{Direction, TraceBuffer};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// User agent reported to the service.
const USER_AGENT: &str = "ollamalink/0.1.0";

/// Client for one Ollama service instance.
///
/// # Example
///
/// ```no_run
/// use ollamalink_core::{GenerateRequest, OllamaClient};
///
/// # async fn run() -> ollamalink_core::ClientResult<()> {
/// let client = OllamaClient::new()?;
/// let request = GenerateRequest::new("llama3", "Why is the sky blue?");
/// let mut on_frame = |frame: &ollamalink_core::ResponseFrame| {
///     print!("{}", frame.response);
///     true
/// };
/// let reply = client.generate_stream(&request, &mut on_frame).await?;
/// # let _ = reply;
/// # Ok(())
/// # }
/// ```
pub struct OllamaClient {
    config: ServiceConfig,
    http: reqwest::Client,
    trace: TraceBuffer,
}

impl OllamaClient {
    /// Client for a local default install.
    pub fn new() -> ClientResult<Self> {
        Self::with_config(ServiceConfig::default())
    }

    /// Client honoring the `OLLAMA_HOST` environment variable.
    pub fn from_env() -> ClientResult<Self> {
        Self::with_config(ServiceConfig::from_env())
    }

    /// Client for an explicit service location.
    pub fn with_config(config: ServiceConfig) -> ClientResult<Self> {
        // Connect timeout only: a total-request timeout would cut long
        // generations short mid-stream.
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ClientError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            config,
            http,
            trace: TraceBuffer::new(),
        })
    }

    /// The configured service location.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The audit trail of raw exchanges made through this client.
    pub fn trace(&self) -> &TraceBuffer {
        &self.trace
    }

    /// Run a non-streaming completion.
    ///
    /// The request is sent with `stream` forced off, so the service answers
    /// with a single terminal frame.
    pub async fn generate(&self, request: &GenerateRequest) -> ClientResult<ResponseFrame> {
        let url = self.config.generate_url()?;
        let mut request = request.clone();
        request.stream = Some(false);
        let body = encode_body(&request)?;

        let request_id = Uuid::new_v4();
        debug!(%request_id, model = %request.model, "dispatching completion request");
        let response = self.post_json(&url, &body, request_id).await?;
        let text = response.text().await?;
        self.trace.record(Direction::Inbound, url.path(), &text);

        let frame = serde_json::from_str(&text)?;
        info!(%request_id, "completion request finished");
        Ok(frame)
    }

    /// Run a streaming completion, feeding each partial frame to `listener`.
    ///
    /// Returns the terminal frame with the full concatenated text in
    /// `response`, or `None` if the listener cancelled the read. An in-band
    /// service error becomes a synthesized terminal frame
    /// (see [`ResponseFrame::is_in_band_error`]), not an `Err`.
    pub async fn generate_stream<L>(
        &self,
        request: &GenerateRequest,
        listener: &mut L,
    ) -> ClientResult<Option<ResponseFrame>>
    where
        L: StreamListener + ?Sized,
    {
        let url = self.config.generate_url()?;
        let mut request = request.clone();
        request.stream = Some(true);
        let body = encode_body(&request)?;

        let request_id = Uuid::new_v4();
        debug!(%request_id, model = %request.model, "dispatching streaming completion request");
        let response = self.post_json(&url, &body, request_id).await?;

        let mut lines = NdjsonLines::new(response.bytes_stream());
        let result = streaming::read_generate(&mut lines, &self.trace, url.path(), listener).await;
        match &result {
            Ok(Some(_)) => info!(%request_id, "streaming completion finished"),
            Ok(None) => info!(%request_id, "streaming completion cancelled by listener"),
            Err(e) => warn!(%request_id, error = %e, "streaming completion failed"),
        }
        result
    }

    /// Run a chat exchange, collecting every received frame.
    pub async fn chat(&self, request: &ChatRequest) -> ClientResult<Vec<ResponseFrame>> {
        self.chat_inner(request, None).await
    }

    /// Run a chat exchange, notifying `listener` of each frame as it arrives.
    ///
    /// Unlike [`generate_stream`](Self::generate_stream), the listener cannot
    /// cancel the read; the call runs to a terminal frame, an in-band error,
    /// or end of stream.
    pub async fn chat_with_listener<L>(
        &self,
        request: &ChatRequest,
        listener: &mut L,
    ) -> ClientResult<Vec<ResponseFrame>>
    where
        L: ChatListener,
    {
        self.chat_inner(request, Some(listener)).await
    }

    async fn chat_inner(
        &self,
        request: &ChatRequest,
        listener: Option<&mut dyn ChatListener>,
    ) -> ClientResult<Vec<ResponseFrame>> {
        let url = self.config.chat_url()?;
        let body = encode_body(request)?;

        let request_id = Uuid::new_v4();
        debug!(%request_id, model = %request.model, "dispatching chat request");
        let response = self.post_json(&url, &body, request_id).await?;

        let mut lines = NdjsonLines::new(response.bytes_stream());
        let frames = streaming::read_chat(&mut lines, &self.trace, url.path(), listener).await?;
        info!(%request_id, frames = frames.len(), "chat request finished");
        Ok(frames)
    }

    /// List the locally available models.
    pub async fn list_models(&self) -> ClientResult<Vec<ModelSummary>> {
        let url = self.config.tags_url()?;
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        let text = response.text().await?;
        self.trace.record(Direction::Inbound, url.path(), &text);

        #[derive(serde::Deserialize)]
        struct TagsEnvelope {
            #[serde(default)]
            models: Vec<ModelSummary>,
        }
        let envelope: TagsEnvelope = serde_json::from_str(&text)?;
        Ok(envelope.models)
    }

    /// Detailed information on one model, as an indented JSON document.
    pub async fn model_details(&self, model: &str) -> ClientResult<String> {
        let tree = self.show_model(model, false).await?;
        Ok(serde_json::to_string_pretty(&tree)?)
    }

    /// The model's tokenizer vocabulary, from the verbose details.
    pub async fn model_token_list(&self, model: &str) -> ClientResult<Vec<String>> {
        let tree = self.show_model(model, true).await?;
        let tokens = tree
            .get("model_info")
            .and_then(|info| info.get("tokenizer.ggml.tokens"))
            .and_then(|tokens| tokens.as_array())
            .ok_or_else(|| {
                ClientError::Parse("tokenizer.ggml.tokens missing from model details".to_string())
            })?;
        Ok(tokens
            .iter()
            .map(|t| t.as_str().unwrap_or_default().to_string())
            .collect())
    }

    async fn show_model(&self, model: &str, verbose: bool) -> ClientResult<serde_json::Value> {
        let url = self.config.show_url()?;
        let body = serde_json::json!({ "model": model, "verbose": verbose }).to_string();

        let request_id = Uuid::new_v4();
        debug!(%request_id, model, verbose, "dispatching model details request");
        let response = self.post_json(&url, &body, request_id).await?;
        let text = response.text().await?;
        self.trace.record(Direction::Inbound, url.path(), &text);
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a JSON body, recording it outbound and mapping non-success
    /// statuses before anyone interprets the response body.
    async fn post_json(
        &self,
        url: &Url,
        body: &str,
        request_id: Uuid,
    ) -> ClientResult<reqwest::Response> {
        self.trace.record(Direction::Outbound, url.path(), body);
        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%request_id, status = status.as_u16(), "request failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

fn encode_body<T: serde::Serialize>(request: &T) -> ClientResult<String> {
    serde_json::to_string(request)
        .map_err(|e| ClientError::Encoding(format!("failed to serialize request: {}", e)))
}

/// Build the next chat turn from the previous one.
///
/// Appends every message carried by `frames` (in arrival order, a frame's
/// own messages in their original order) to the request's message history.
/// Frames without messages contribute nothing. The request is taken by value
/// and returned; clone first if the original must stay untouched.
pub fn merge(mut request: ChatRequest, frames: &[ResponseFrame]) -> ChatRequest {
    for frame in frames {
        if let Some(messages) = &frame.messages {
            request.messages.extend(messages.iter().cloned());
        } else if let Some(message) = &frame.message {
            request.messages.push(message.clone());
        }
    }
    request
}

/// Re-indent a JSON document for human eyes.
///
/// # Errors
///
/// [`ClientError::Parse`] when the input is not valid JSON.
pub fn pretty(json: &str) -> ClientResult<String> {
    let tree: serde_json::Value = serde_json::from_str(json)?;
    Ok(serde_json::to_string_pretty(&tree)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, MessageRole};

    fn msg(role: MessageRole, content: &str) -> Message {
        Message::new(role, content)
    }

    fn frame_with_messages(messages: Vec<Message>) -> ResponseFrame {
        ResponseFrame {
            messages: Some(messages),
            ..ResponseFrame::default()
        }
    }

    #[test]
    fn merge_preserves_input_order() {
        let request = ChatRequest::new("llama3").push_message(msg(MessageRole::User, "A"));
        let frames = vec![
            frame_with_messages(vec![
                msg(MessageRole::Assistant, "B"),
                msg(MessageRole::Assistant, "C"),
            ]),
            frame_with_messages(Vec::new()),
            frame_with_messages(vec![msg(MessageRole::Assistant, "D")]),
        ];

        let merged = merge(request, &frames);
        let contents: Vec<&str> = merged.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["A", "B", "C", "D"]);
    }

    #[test]
    fn merge_uses_singular_message_when_list_is_absent() {
        let request = ChatRequest::new("llama3").push_user("hi");
        let frames = vec![ResponseFrame {
            message: Some(msg(MessageRole::Assistant, "hello")),
            ..ResponseFrame::default()
        }];

        let merged = merge(request, &frames);
        assert_eq!(merged.messages.len(), 2);
        assert_eq!(merged.messages[1].content, "hello");
    }

    #[test]
    fn merge_with_no_frames_keeps_history() {
        let request = ChatRequest::new("llama3").push_user("hi");
        let merged = merge(request.clone(), &[]);
        assert_eq!(merged, request);
    }

    #[test]
    fn merge_ignores_frames_without_messages() {
        let request = ChatRequest::new("llama3");
        let frames = vec![ResponseFrame::default(), ResponseFrame::default()];
        let merged = merge(request, &frames);
        assert!(merged.messages.is_empty());
    }

    #[test]
    fn pretty_indents_valid_json() {
        let formatted = pretty(r#"{"models":[{"name":"llama3"}]}"#).unwrap();
        assert!(formatted.contains("\n"));
        assert!(formatted.contains("\"llama3\""));
    }

    #[test]
    fn pretty_rejects_invalid_json() {
        assert!(matches!(pretty("{oops"), Err(ClientError::Parse(_))));
    }

    #[test]
    fn client_builds_with_defaults() {
        let client = OllamaClient::new().unwrap();
        assert_eq!(client.config().base_url(), "http://127.0.0.1:11434");
        assert!(client.trace().is_empty());
    }
}
