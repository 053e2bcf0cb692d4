//! Utility module for common functionality

use once_cell::sync::Lazy;
use regex::Regex;

static REDACTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Bearer [A-Za-z0-9\-_\.]+", "Bearer [REDACTED]"),
        (r"sk-[A-Za-z0-9\-_]{8,}", "sk-[REDACTED]"),
        (r"(?i)api[_-]?key[=:]\s*[A-Za-z0-9\-_]+", "api_key=[REDACTED]"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Truncate a string to at most `max_len` characters, adding an ellipsis if truncated
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{}...", head)
}

/// Remove credentials from text before it reaches the log stream
pub fn sanitize_for_logging(s: &str) -> String {
    REDACTIONS
        .iter()
        .fold(s.to_string(), |acc, (re, replacement)| re.replace_all(&acc, *replacement).into_owned())
}

/// Generate a correlation id for one invocation
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("journée", 5), "jo...");
        assert_eq!(truncate_string("hi", 2), "hi");
    }

    #[test]
    fn test_sanitize_for_logging() {
        let output = sanitize_for_logging("Incorrect API key provided: sk-abcdef1234567890");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("abcdef1234567890"));

        let output = sanitize_for_logging("Authorization: Bearer abc123xyz");
        assert!(!output.contains("abc123xyz"));
    }
}
