//! # Sophy Client
//!
//! Resilient completion client used by every AI-backed InkWell feature.
//!
//! This crate provides:
//!
//! - Completion request/response types shared by OpenAI and Anthropic
//! - A transport seam (`CompletionTransport`) with a reqwest implementation
//! - The `Invoker`: bounded retries, per-attempt timeouts, exponential backoff
//! - A closed error taxonomy (`ErrorKind`) with retryable flags and calm
//!   user-facing messages
//! - Environment-driven configuration

pub mod config;
pub use config::{ClientConfig, ConfigProvider, EnvConfigProvider, MemoryConfigProvider};

pub mod error;
pub use error::{ConfigError, ErrorKind, InvokeError, Result};

pub mod invoker;
pub use invoker::{AttemptOutcome, Invoker, RetryPolicy};

pub mod models;
pub use models::{ChatMessage, CompletionRequest, CompletionResponse, Role};

pub mod provider;
pub use provider::Provider;

pub mod transport;
pub use transport::{CompletionTransport, HttpTransport, TransportError, TransportResponse};

pub mod util;

#[cfg(test)]
mod tests;

/// Build an HTTP-backed invoker from the process environment
pub fn invoker_from_env() -> std::result::Result<Invoker, ConfigError> {
    let config = ClientConfig::from_env()?;
    Invoker::from_config(&config)
}
