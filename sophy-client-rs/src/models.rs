//! Completion request and response types
//!
//! A `CompletionRequest` is built once by a handler and never changes while
//! the invoker retries it. `CompletionResponse` keeps the provider payload
//! untouched and offers extraction helpers on top.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// One logical completion call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl CompletionRequest {
    /// Start a request for the given model id
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Append a message; order is preserved on the wire
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Replace the model id, keeping everything else
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn max_output_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn sampling_temperature(&self) -> Option<f32> {
        self.temperature
    }
}

/// Raw provider payload returned by a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    payload: Value,
}

impl CompletionResponse {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Parse a response body; fails if the body is not JSON
    pub fn from_body(body: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(body).map(Self::new)
    }

    /// Text of the first completion.
    ///
    /// Reads `choices[0].message.content` (OpenAI) or `content[0].text`
    /// (Anthropic).
    pub fn text(&self) -> Option<&str> {
        self.payload
            .pointer("/choices/0/message/content")
            .or_else(|| self.payload.pointer("/content/0/text"))
            .and_then(Value::as_str)
    }

    /// Total tokens billed, if the provider reported usage
    pub fn total_tokens(&self) -> Option<u64> {
        let usage = self.payload.get("usage")?;
        usage.get("total_tokens").and_then(Value::as_u64).or_else(|| {
            let input = usage.get("input_tokens").and_then(Value::as_u64)?;
            let output = usage.get("output_tokens").and_then(Value::as_u64)?;
            Some(input + output)
        })
    }
}
