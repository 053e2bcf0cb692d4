//! Completion providers and their wire differences

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

use crate::error::ConfigError;
use crate::models::{CompletionRequest, Role};

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// The messages API requires max_tokens; used when a request leaves it unset.
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Provider::OpenAi => OPENAI_ENDPOINT,
            Provider::Anthropic => ANTHROPIC_ENDPOINT,
        }
    }

    /// Name of the deployed secret holding this provider's key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Authentication headers for one request
    pub fn auth_headers(&self, api_key: &str) -> Vec<(&'static str, String)> {
        match self {
            Provider::OpenAi => vec![("Authorization", format!("Bearer {}", api_key))],
            Provider::Anthropic => vec![
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
        }
    }

    /// JSON body for the provider's completion endpoint
    pub fn request_body(&self, request: &CompletionRequest) -> Value {
        match self {
            Provider::OpenAi => json!(request),
            Provider::Anthropic => {
                let system = request
                    .messages()
                    .iter()
                    .filter(|m| m.role == Role::System)
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");

                let messages: Vec<_> = request
                    .messages()
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .collect();

                let mut body = json!({
                    "model": request.model_id(),
                    "messages": messages,
                    "max_tokens": request.max_output_tokens().unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
                });

                if !system.is_empty() {
                    body["system"] = Value::String(system);
                }
                if let Some(temperature) = request.sampling_temperature() {
                    body["temperature"] = json!(temperature);
                }
                body
            }
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(ConfigError::Invalid {
                key: "llm_provider".to_string(),
                reason: format!("unsupported provider '{}'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;

    fn reflection_request() -> CompletionRequest {
        CompletionRequest::new("claude-3-5-sonnet-latest")
            .message(ChatMessage::system("You are Sophy."))
            .message(ChatMessage::user("Today felt heavy."))
            .max_tokens(500)
            .temperature(0.8)
    }

    #[test]
    fn test_openai_body_passes_messages_through() {
        let body = Provider::OpenAi.request_body(&reflection_request());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Today felt heavy.");
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn test_anthropic_body_lifts_system_prompt() {
        let body = Provider::Anthropic.request_body(&reflection_request());
        assert_eq!(body["system"], "You are Sophy.");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn test_anthropic_auth_headers() {
        let headers = Provider::Anthropic.auth_headers("k");
        assert!(headers.contains(&("x-api-key", "k".to_string())));
        assert!(headers.iter().any(|(name, _)| *name == "anthropic-version"));
        assert_eq!(
            Provider::OpenAi.auth_headers("k"),
            vec![("Authorization", "Bearer k".to_string())]
        );
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("anthropic".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!("cohere".parse::<Provider>().is_err());
    }
}
