//! Outbound transport for completion calls
//!
//! The invoker only needs "send this request, give me a status and a body".
//! `HttpTransport` does that over reqwest; tests plug in scripted transports.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ClientConfig;
use crate::error::{ConfigError, ErrorKind};
use crate::models::CompletionRequest;
use crate::provider::Provider;

/// Status and body of a provider response, success or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A failure that produced no HTTP response (DNS, connect, reset, body read)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
    /// Set when the transport knows the failure class; `None` falls back to
    /// keyword classification of `message`
    pub kind: Option<ErrorKind>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let (label, kind) = if err.is_timeout() {
            ("Request timed out", Some(ErrorKind::Timeout))
        } else if err.is_connect() {
            ("Connection failed", Some(ErrorKind::NetworkError))
        } else if err.is_request() {
            ("Request failed", Some(ErrorKind::NetworkError))
        } else {
            ("Network error", None)
        };

        // The URL stays out of the message so host and port digits never
        // reach keyword classification.
        let err = err.without_url();
        let mut message = format!("{}: {}", label, err);
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(&format!(": {}", cause));
            source = cause.source();
        }

        TransportError { message, kind }
    }
}

/// Trait responsible for delivering one completion request
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Send the request once; no retries, no timeout
    async fn send(&self, request: &CompletionRequest) -> Result<TransportResponse, TransportError>;

    /// Where requests go, for log lines
    fn target(&self) -> &str;
}

/// reqwest-backed transport for OpenAI and Anthropic
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    provider: Provider,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(provider: Provider, endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        // No client-level timeout: the invoker bounds each attempt itself.
        let client = Client::builder()
            .user_agent(concat!("InkWell-Sophy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            provider,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::new(config.provider, config.endpoint.clone(), config.api_key.clone())
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn send(&self, request: &CompletionRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&self.provider.request_body(request));

        for (name, value) in self.provider.auth_headers(&self.api_key) {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }

    fn target(&self) -> &str {
        &self.endpoint
    }
}
