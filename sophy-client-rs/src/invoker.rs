//! Resilient completion invoker
//!
//! Wraps one logical completion call in a bounded retry loop:
//!
//! 1. Each attempt runs under its own deadline. When the deadline passes the
//!    attempt future is dropped, which cancels the in-flight request.
//! 2. Failures are classified first; transient kinds (timeout, rate limit,
//!    server error, network error) are retried.
//! 3. Every other kind is returned at once.
//! 4. Between retries the invoker sleeps on an exponential backoff starting
//!    at `base_delay` and doubling each time, with no jitter.
//! 5. When attempts run out, the last attempt's classified error is returned.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use log::{error, info, warn};

use crate::config::ClientConfig;
use crate::error::{classify, ConfigError, ErrorKind, InvokeError, Result};
use crate::models::{CompletionRequest, CompletionResponse};
use crate::transport::{CompletionTransport, HttpTransport, TransportError, TransportResponse};
use crate::util::{generate_request_id, sanitize_for_logging};

/// Ceiling for a single backoff sleep
const MAX_BACKOFF_INTERVAL: Duration = Duration::from_secs(300);

/// Retry policy for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,

    /// Deadline for each individual attempt
    pub attempt_timeout: Duration,

    /// Delay after the first failed attempt; doubles after each later one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(20),
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Fresh backoff schedule for one invocation: `base_delay`, then doubling
    pub fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.base_delay,
            max_interval: MAX_BACKOFF_INTERVAL.max(self.base_delay),
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        backoff.reset();
        backoff
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryPolicy {{ max_attempts: {}, attempt_timeout: {:?}, base_delay: {:?} }}",
            self.max_attempts, self.attempt_timeout, self.base_delay
        )
    }
}

/// Result of a single attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(CompletionResponse),
    Retryable(InvokeError),
    Fatal(InvokeError),
}

impl AttemptOutcome {
    /// Retryable for transient kinds, fatal otherwise
    fn failed(err: InvokeError) -> Self {
        if err.kind().is_transient() {
            AttemptOutcome::Retryable(err)
        } else {
            AttemptOutcome::Fatal(err)
        }
    }

    /// Interpret a provider response
    pub fn from_response(response: &TransportResponse) -> Self {
        let status = response.status;

        if response.is_success() {
            return match CompletionResponse::from_body(&response.body) {
                Ok(parsed) => AttemptOutcome::Success(parsed),
                Err(e) => AttemptOutcome::Fatal(
                    InvokeError::unknown(format!("Malformed completion payload: {}", e)).with_status(Some(status)),
                ),
            };
        }

        let detail = sanitize_for_logging(&classify::provider_message(&response.body));
        let kind = classify::classify(Some(status), &detail);
        Self::failed(InvokeError::new(kind, format!("Provider returned {}: {}", status, detail)).with_status(Some(status)))
    }

    /// Interpret a failure that produced no HTTP response
    pub fn from_transport_error(err: &TransportError) -> Self {
        let message = sanitize_for_logging(&err.message);
        let kind = err.kind.unwrap_or_else(|| match classify::classify_message(&message) {
            ErrorKind::Unknown => ErrorKind::NetworkError,
            kind => kind,
        });
        Self::failed(InvokeError::new(kind, message))
    }
}

/// Bounded-retry completion caller shared by every AI-backed handler
#[derive(Clone)]
pub struct Invoker {
    transport: Arc<dyn CompletionTransport>,
    policy: RetryPolicy,
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("target", &self.transport.target())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Invoker {
    pub fn new(transport: Arc<dyn CompletionTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Build an HTTP-backed invoker from configuration
    pub fn from_config(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport), config.retry_policy()))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Perform one logical completion call.
    ///
    /// `label` only tags log lines. Every exit path is either the provider
    /// payload or a classified `InvokeError`.
    pub async fn invoke(&self, request: &CompletionRequest, label: &str) -> Result<CompletionResponse> {
        self.run(request, label, Ok).await
    }

    /// Invoke and return the trimmed completion text.
    ///
    /// A 2xx payload without completion text is an `Unknown` failure of that
    /// attempt and is not retried.
    pub async fn invoke_text(&self, request: &CompletionRequest, label: &str) -> Result<String> {
        self.run(request, label, |response| match response.text() {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(InvokeError::unknown("Completion payload contained no text")),
        })
        .await
    }

    async fn run<T, F>(&self, request: &CompletionRequest, label: &str, extract: F) -> Result<T>
    where
        F: Fn(CompletionResponse) -> Result<T> + Send,
        T: Send,
    {
        let correlation_id = generate_request_id();
        let target = self.transport.target();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = self.policy.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut status = None;

            let outcome = match tokio::time::timeout(self.policy.attempt_timeout, self.transport.send(request)).await {
                Ok(Ok(response)) => {
                    info!(
                        "[{}] {} attempt {}/{} -> {} status {}",
                        correlation_id, label, attempt, max_attempts, target, response.status
                    );
                    status = Some(response.status);
                    AttemptOutcome::from_response(&response)
                }
                Ok(Err(err)) => {
                    warn!(
                        "[{}] {} attempt {}/{} -> {} failed: {}",
                        correlation_id,
                        label,
                        attempt,
                        max_attempts,
                        target,
                        sanitize_for_logging(&err.message)
                    );
                    AttemptOutcome::from_transport_error(&err)
                }
                Err(_) => {
                    warn!(
                        "[{}] {} attempt {}/{} -> {} timed out after {:?}",
                        correlation_id, label, attempt, max_attempts, target, self.policy.attempt_timeout
                    );
                    AttemptOutcome::Retryable(InvokeError::timeout(format!(
                        "Request timed out after {:?}",
                        self.policy.attempt_timeout
                    )))
                }
            };

            let (err, retryable) = match outcome {
                AttemptOutcome::Success(response) => {
                    let tokens = response.total_tokens();
                    match extract(response) {
                        Ok(value) => {
                            match tokens {
                                Some(tokens) => info!(
                                    "[{}] {} succeeded after {} attempt(s), {} tokens",
                                    correlation_id, label, attempt, tokens
                                ),
                                None => info!("[{}] {} succeeded after {} attempt(s)", correlation_id, label, attempt),
                            }
                            return Ok(value);
                        }
                        Err(err) => (err.with_status(status), false),
                    }
                }
                AttemptOutcome::Retryable(err) => (err, true),
                AttemptOutcome::Fatal(err) => (err, false),
            };

            if retryable && attempt < max_attempts {
                if let Some(delay) = backoff.next_backoff() {
                    warn!(
                        "[{}] {} retryable {} ({}), retrying in {:?}",
                        correlation_id,
                        label,
                        err.kind(),
                        err.message(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }

            let err = err.with_attempts(attempt);
            error!(
                "[{}] {} failed after {} attempt(s) at {}: {} (retryable: {})",
                correlation_id,
                label,
                attempt,
                err.occurred_at().to_rfc3339(),
                err,
                err.is_retryable()
            );
            return Err(err);
        }
    }
}
