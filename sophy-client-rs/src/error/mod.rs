//! Error handling for the Sophy client
//!
//! This module provides:
//! - The closed `ErrorKind` taxonomy every failed completion call ends in
//! - `InvokeError`, the classified failure returned by the invoker
//! - `ConfigError` for problems loading client configuration
//! - A convenient Result type alias

use std::fmt;
use thiserror::Error;

pub mod classify;

/// Result type for completion calls
pub type Result<T> = std::result::Result<T, InvokeError>;

/// Classification of a failed completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The attempt exceeded its deadline
    Timeout,

    /// The provider throttled the request (HTTP 429)
    RateLimited,

    /// The provider rejected the credentials (HTTP 401)
    Unauthorized,

    /// The credentials lack access to the model or endpoint (HTTP 403)
    Forbidden,

    /// The provider rejected the request body (HTTP 400)
    InvalidRequest,

    /// The provider failed internally (HTTP 5xx)
    ServerError,

    /// The request never produced an HTTP response
    NetworkError,

    /// Anything the classifier could not match
    Unknown,
}

impl ErrorKind {
    /// Every kind, in taxonomy order
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Timeout,
        ErrorKind::RateLimited,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::InvalidRequest,
        ErrorKind::ServerError,
        ErrorKind::NetworkError,
        ErrorKind::Unknown,
    ];

    /// Stable machine-readable code relayed to front-end clients
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::ServerError => "server_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether a user should be offered a "try again" affordance.
    ///
    /// `Unknown` counts as retryable so an unmatched failure still leaves
    /// the user a way forward.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::Timeout
            | ErrorKind::RateLimited
            | ErrorKind::ServerError
            | ErrorKind::NetworkError
            | ErrorKind::Unknown => true,
            ErrorKind::Unauthorized | ErrorKind::Forbidden | ErrorKind::InvalidRequest => false,
        }
    }

    /// Kinds the invoker tries again after backing off; every other kind
    /// ends the invocation on first occurrence.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::RateLimited | ErrorKind::ServerError | ErrorKind::NetworkError
        )
    }

    /// Short, calm message safe to show in the journal UI
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "Sophy is taking longer than usual. Please try again in a moment.",
            ErrorKind::RateLimited => "Sophy is helping a lot of people right now. Please try again shortly.",
            ErrorKind::Unauthorized | ErrorKind::Forbidden => {
                "Sophy isn't available right now. We're looking into it."
            }
            ErrorKind::InvalidRequest => "Sophy couldn't work with that request. Try rephrasing or shortening it.",
            ErrorKind::ServerError => "Sophy's service is having a hiccup. Please try again shortly.",
            ErrorKind::NetworkError => "We couldn't reach Sophy. Check your connection and try again.",
            ErrorKind::Unknown => "Sophy couldn't reflect right now. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified completion failure
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct InvokeError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    attempts: u32,
    occurred_at: chrono::DateTime<chrono::Utc>,
}

impl InvokeError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            attempts: 0,
            occurred_at: chrono::Utc::now(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Attach the HTTP status the error was classified from
    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }

    /// Record how many attempts were made before this error surfaced
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Number of attempts performed; 0 when the error did not come from the invoker
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn occurred_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.occurred_at
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Calm message for end users; never includes provider details
    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

/// Errors raised while loading or validating client configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_flags() {
        let retryable: Vec<_> = ErrorKind::ALL.iter().filter(|k| k.is_retryable()).collect();
        assert_eq!(
            retryable,
            vec![
                &ErrorKind::Timeout,
                &ErrorKind::RateLimited,
                &ErrorKind::ServerError,
                &ErrorKind::NetworkError,
                &ErrorKind::Unknown,
            ]
        );
    }

    #[test]
    fn test_unknown_is_retryable_but_not_transient() {
        let transient: Vec<_> = ErrorKind::ALL.iter().filter(|k| k.is_transient()).collect();
        assert_eq!(
            transient,
            vec![
                &ErrorKind::Timeout,
                &ErrorKind::RateLimited,
                &ErrorKind::ServerError,
                &ErrorKind::NetworkError,
            ]
        );
        assert!(ErrorKind::Unknown.is_retryable());
        assert!(!ErrorKind::Unknown.is_transient());
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = InvokeError::network("connection reset").with_attempts(3);
        assert_eq!(err.to_string(), "network_error: connection reset");
        assert_eq!(err.attempts(), 3);
    }

    #[test]
    fn test_user_messages_do_not_leak_codes() {
        for kind in ErrorKind::ALL {
            let msg = kind.user_message();
            assert!(!msg.is_empty());
            assert!(!msg.contains(kind.code()));
        }
    }
}
