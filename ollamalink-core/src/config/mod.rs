//! Service configuration and endpoint construction
//!
//! A [`ServiceConfig`] names one Ollama instance and builds the concrete
//! endpoint URLs the client talks to. Defaults point at a local install
//! (`http://127.0.0.1:11434`); `OLLAMA_HOST` overrides them the same way the
//! official tooling does.

use crate::error::{ClientError, ClientResult};
use url::Url;

/// Environment variable honored by [`ServiceConfig::from_env`].
const HOST_ENV_VAR: &str = "OLLAMA_HOST";

const API_GENERATE: &str = "/api/generate";
const API_CHAT: &str = "/api/chat";
const API_TAGS: &str = "/api/tags";
const API_SHOW: &str = "/api/show";

/// Location of an Ollama HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// URL scheme, `http` unless the instance sits behind TLS termination.
    scheme: String,
    /// Host name or IP address.
    host: String,
    /// TCP port, 11434 by default.
    port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: 11434,
        }
    }
}

impl ServiceConfig {
    /// Configuration for a local default install.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the environment.
    ///
    /// `OLLAMA_HOST` accepts a bare host (`remote`), a host with port
    /// (`remote:11434`), or a full URL (`http://remote:11434`). Unset or
    /// blank falls back to the defaults.
    pub fn from_env() -> Self {
        match std::env::var(HOST_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => {
                let mut config = Self::default();
                config.apply_host_spec(value.trim());
                config
            }
            _ => Self::default(),
        }
    }

    /// Override the host name or IP address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the URL scheme.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Base URL string, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// URL of the completion endpoint.
    pub fn generate_url(&self) -> ClientResult<Url> {
        self.endpoint_url(API_GENERATE)
    }

    /// URL of the chat endpoint.
    pub fn chat_url(&self) -> ClientResult<Url> {
        self.endpoint_url(API_CHAT)
    }

    /// URL of the local-model listing endpoint.
    pub fn tags_url(&self) -> ClientResult<Url> {
        self.endpoint_url(API_TAGS)
    }

    /// URL of the model-details endpoint.
    pub fn show_url(&self) -> ClientResult<Url> {
        self.endpoint_url(API_SHOW)
    }

    fn endpoint_url(&self, path: &str) -> ClientResult<Url> {
        Url::parse(&format!("{}{}", self.base_url(), path)).map_err(|e| {
            ClientError::Configuration(format!("invalid endpoint URL for {:?}: {}", self.host, e))
        })
    }

    /// Fold a `host`, `host:port`, or full-URL specification into the config.
    pub(crate) fn apply_host_spec(&mut self, spec: &str) {
        let (scheme, rest) = match spec.split_once("://") {
            Some((scheme, rest)) => (Some(scheme), rest),
            None => (None, spec),
        };
        if let Some(scheme) = scheme {
            self.scheme = scheme.to_string();
        }
        let rest = rest.trim_end_matches('/');
        match rest.rsplit_once(':') {
            Some((host, port)) => {
                if let Ok(port) = port.parse::<u16>() {
                    self.host = host.to_string();
                    self.port = port;
                } else {
                    // No parseable port; treat the whole thing as a host
                    // (covers bare IPv6 literals).
                    self.host = rest.to_string();
                }
            }
            None => self.host = rest.to_string(),
        }
    }
}
