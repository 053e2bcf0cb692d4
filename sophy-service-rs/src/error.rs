//! HTTP error mapping
//!
//! Every failure leaves a handler as JSON:
//! `{ "error", "code", "retryable", "attempts" }`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sophy_client::{ErrorKind, InvokeError};
use thiserror::Error;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub retryable: bool,
    pub attempts: u32,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was rejected before any outbound call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The completion call failed after the invoker gave up
    #[error(transparent)]
    Upstream(#[from] InvokeError),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidArgument(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(err) => status_for_kind(err.kind()),
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        match self {
            ApiError::InvalidArgument(message) => ErrorResponse {
                error: message.clone(),
                code: "invalid_argument".to_string(),
                retryable: false,
                attempts: 0,
            },
            ApiError::Upstream(err) => ErrorResponse {
                error: err.user_message().to_string(),
                code: err.kind().code().to_string(),
                retryable: err.is_retryable(),
                attempts: err.attempts(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidArgument(rejection.body_text())
    }
}

/// HTTP status relayed to the front end for an upstream failure
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::ServerError | ErrorKind::NetworkError => StatusCode::BAD_GATEWAY,
        ErrorKind::Unauthorized | ErrorKind::Forbidden | ErrorKind::InvalidRequest | ErrorKind::Unknown => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::InvalidArgument(message) => tracing::warn!(%message, "rejected request"),
            ApiError::Upstream(err) => tracing::error!(
                kind = %err.kind(),
                attempts = err.attempts(),
                status = ?err.status(),
                occurred_at = %err.occurred_at().to_rfc3339(),
                "completion failed: {}",
                err.message()
            ),
        }
        (status, Json(self.to_body())).into_response()
    }
}
