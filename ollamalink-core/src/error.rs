//! Client error types and handling

use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur when talking to an Ollama service
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout occurred
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The service answered with a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response line or body was not decodable
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The response stream ended before a terminal frame arrived
    #[error("Response stream ended before a terminal frame")]
    StreamTruncated,

    /// Role string is not one of system, user, assistant, tool
    #[error("Invalid message role: {0:?}")]
    InvalidRole(String),

    /// An image payload could not be read or serialized for transport
    #[error("Failed to encode image payload: {0}")]
    Encoding(String),

    /// Configuration error (bad host, unparseable URL, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(30) // Default timeout value
        } else if err.is_connect() {
            ClientError::Network(format!("Connection failed: {}", err))
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Configuration(err.to_string())
    }
}
