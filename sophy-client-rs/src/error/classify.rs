//! Failure classification for completion providers
//!
//! The HTTP status wins whenever one is available. Only when there is no
//! status, or the status is not one we recognise, do we fall back to keyword
//! matching on the message. Keyword matching is best-effort: provider and
//! transport messages are free text and may change without notice.

use serde_json::Value;

use super::ErrorKind;

/// Ordered keyword rules; the first rule with a matching needle wins.
const MESSAGE_RULES: &[(ErrorKind, &[&str])] = &[
    (ErrorKind::Timeout, &["timeout", "timed out", "etimedout"]),
    (ErrorKind::RateLimited, &["429", "rate limit", "too many requests"]),
    (ErrorKind::Unauthorized, &["401", "unauthorized", "invalid api key", "incorrect api key"]),
    (ErrorKind::Forbidden, &["403", "forbidden"]),
    (ErrorKind::InvalidRequest, &["400", "bad request", "invalid request"]),
    (
        ErrorKind::ServerError,
        &["500", "502", "503", "504", "server error", "overloaded"],
    ),
    (
        ErrorKind::NetworkError,
        &[
            "network",
            "econnreset",
            "econnrefused",
            "enotfound",
            "socket hang up",
            "connection",
            "dns",
        ],
    ),
];

/// Longest provider message kept, structured or not
const MAX_PROVIDER_MESSAGE: usize = 300;

/// Classify a failure by status code first, then by message keywords
pub fn classify(status: Option<u16>, message: &str) -> ErrorKind {
    status
        .and_then(classify_status)
        .unwrap_or_else(|| classify_message(message))
}

/// Map a recognised HTTP status to a kind
pub fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        400 => Some(ErrorKind::InvalidRequest),
        401 => Some(ErrorKind::Unauthorized),
        403 => Some(ErrorKind::Forbidden),
        408 => Some(ErrorKind::Timeout),
        429 => Some(ErrorKind::RateLimited),
        500..=599 => Some(ErrorKind::ServerError),
        _ => None,
    }
}

/// Case-insensitive keyword fallback; `Unknown` when nothing matches
pub fn classify_message(message: &str) -> ErrorKind {
    let lowered = message.to_lowercase();
    MESSAGE_RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| lowered.contains(needle)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

/// Pull a readable message out of a provider error body.
///
/// OpenAI and Anthropic both answer with `{"error": {"message": ...}}`;
/// some gateways send `{"message": ...}` or `{"error": "..."}`. Anything
/// else is used as trimmed raw text. Either way the result is capped.
pub fn provider_message(body: &str) -> String {
    let json = serde_json::from_str::<Value>(body).ok();
    let message = json
        .as_ref()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(Value::as_str)
                .or_else(|| json.get("message").and_then(Value::as_str))
        })
        .unwrap_or(body);

    crate::util::truncate_string(message.trim(), MAX_PROVIDER_MESSAGE)
}
