//! AI-backed journaling features
//!
//! Each task turns a validated request into one `CompletionRequest` and
//! post-processes the completion text. Blank required inputs are rejected
//! here, before anything reaches the invoker.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sophy_client::util::truncate_string;
use sophy_client::{ChatMessage, CompletionRequest};

use crate::error::ApiError;

pub const SOPHY_SYSTEM_PROMPT: &str = "You are Sophy, a supportive journaling assistant informed by Gestalt Therapy, \
Positive Psychology, SAMHSA's Eight Dimensions of Wellness, Kukulu Kumuhana, and Atomic Habits. \
Respond with warmth and empathy. Keep your reflections brief, focused, and emotionally clear, \
no more than 2-3 ideas at once. Break thoughts into short, readable paragraphs. \
Avoid overwhelming the user. If helpful, suggest small, practical actions that build momentum over time.";

pub const MANIFEST_SYSTEM_PROMPT: &str = "You are a journaling assistant that helps users articulate their vision \
and purpose in a supportive, emotionally aware tone.";

const TRANSCRIPT_SYSTEM_PROMPT: &str = "You clean up voice-to-text journal transcripts. Fix punctuation, \
capitalization and obvious transcription mistakes, and remove filler words. Keep the writer's voice and \
meaning. Do not add new content. Return only the cleaned text.";

const RANKING_SYSTEM_PROMPT: &str = "You rank journal entries by how relevant they are to a search query. \
Reply with a JSON array of entry ids, most relevant first, and nothing else.";

/// Longest entry excerpt sent for ranking or insights
const MAX_EXCERPT_CHARS: usize = 1500;

/// Model and sampling settings for one task
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskProfile {
    pub label: &'static str,
    pub model: &'static str,
    pub max_tokens: u32,
    pub temperature: f32,
}

pub const JOURNAL_PROMPT: TaskProfile = TaskProfile {
    label: "generatePrompt",
    model: "gpt-3.5-turbo",
    max_tokens: 60,
    temperature: 0.7,
};

pub const REFLECTION: TaskProfile = TaskProfile {
    label: "askSophy",
    model: "gpt-4",
    max_tokens: 500,
    temperature: 0.8,
};

pub const MANIFEST: TaskProfile = TaskProfile {
    label: "refineManifest",
    model: "gpt-4",
    max_tokens: 300,
    temperature: 0.7,
};

pub const TRANSCRIPT_CLEANUP: TaskProfile = TaskProfile {
    label: "cleanTranscript",
    model: "gpt-3.5-turbo",
    max_tokens: 1000,
    temperature: 0.2,
};

pub const RANKING: TaskProfile = TaskProfile {
    label: "rankEntries",
    model: "gpt-3.5-turbo",
    max_tokens: 200,
    temperature: 0.0,
};

pub const INSIGHTS: TaskProfile = TaskProfile {
    label: "generateInsights",
    model: "gpt-4",
    max_tokens: 700,
    temperature: 0.7,
};

impl TaskProfile {
    /// Start a request with this profile; `model_override` replaces the model
    pub fn request(&self, model_override: Option<&str>) -> CompletionRequest {
        CompletionRequest::new(model_override.unwrap_or(self.model))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
    }
}

/// Trimmed value of a required text field
pub fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid(format!("{} must be a non-empty string.", field)));
    }
    Ok(trimmed)
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub prompt: String,
}

pub fn journal_prompt(req: &PromptRequest, model_override: Option<&str>) -> CompletionRequest {
    let content = match req.topic.as_deref().map(str::trim) {
        Some(topic) if !topic.is_empty() => format!("Give me a journaling prompt about: {}", topic),
        _ => "Give me a creative journaling prompt to help reflect on today.".to_string(),
    };
    JOURNAL_PROMPT.request(model_override).message(ChatMessage::user(content))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReflectionRequest {
    #[serde(default)]
    pub entry: String,
}

#[derive(Debug, Serialize)]
pub struct ReflectionResponse {
    pub insight: String,
}

pub fn reflection(req: &ReflectionRequest, model_override: Option<&str>) -> Result<CompletionRequest, ApiError> {
    let entry = require("entry", &req.entry)?;
    Ok(REFLECTION
        .request(model_override)
        .message(ChatMessage::system(SOPHY_SYSTEM_PROMPT))
        .message(ChatMessage::user(entry)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ManifestRequest {
    #[serde(default)]
    pub statement: String,
}

#[derive(Debug, Serialize)]
pub struct ManifestResponse {
    pub refined: String,
}

pub fn manifest(req: &ManifestRequest, model_override: Option<&str>) -> Result<CompletionRequest, ApiError> {
    let statement = require("Manifest statement", &req.statement)?;
    let prompt = format!(
        "Please help refine this personal manifest statement to make it meaningful, clear, and inspiring:\n\"{}\"",
        statement
    );
    Ok(MANIFEST
        .request(model_override)
        .message(ChatMessage::system(MANIFEST_SYSTEM_PROMPT))
        .message(ChatMessage::user(prompt)))
}

#[derive(Debug, Default, Deserialize)]
pub struct TranscriptRequest {
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub cleaned: String,
}

pub fn transcript_cleanup(req: &TranscriptRequest, model_override: Option<&str>) -> Result<CompletionRequest, ApiError> {
    let transcript = require("transcript", &req.transcript)?;
    Ok(TRANSCRIPT_CLEANUP
        .request(model_override)
        .message(ChatMessage::system(TRANSCRIPT_SYSTEM_PROMPT))
        .message(ChatMessage::user(transcript)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankEntry {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub entries: Vec<RankEntry>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub ranked: Vec<String>,
}

pub fn ranking(req: &RankRequest, model_override: Option<&str>) -> Result<CompletionRequest, ApiError> {
    let query = require("query", &req.query)?;
    if req.entries.is_empty() {
        return Err(ApiError::invalid("entries must contain at least one entry."));
    }
    if req.entries.iter().any(|e| e.id.trim().is_empty()) {
        return Err(ApiError::invalid("every entry needs a non-empty id."));
    }

    let mut listing = String::new();
    for entry in &req.entries {
        listing.push_str(&format!(
            "id: {}\ntext: {}\n\n",
            entry.id.trim(),
            truncate_string(entry.text.trim(), MAX_EXCERPT_CHARS)
        ));
    }

    Ok(RANKING
        .request(model_override)
        .message(ChatMessage::system(RANKING_SYSTEM_PROMPT))
        .message(ChatMessage::user(format!("Query: {}\n\nEntries:\n{}", query, listing))))
}

/// Turn a ranking completion into an ordering of the input ids.
///
/// The first JSON array in `text` is read; unknown and repeated ids are
/// dropped and ids the model left out follow in input order.
pub fn parse_ranking(text: &str, entries: &[RankEntry]) -> Vec<String> {
    let known: Vec<&str> = entries.iter().map(|e| e.id.trim()).collect();
    let mut seen = HashSet::new();
    let mut ranked = Vec::with_capacity(known.len());

    for candidate in first_json_array(text).unwrap_or_default() {
        let id = match candidate {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if known.contains(&id.as_str()) && seen.insert(id.clone()) {
            ranked.push(id);
        }
    }

    for id in known {
        if seen.insert(id.to_string()) {
            ranked.push(id.to_string());
        }
    }

    ranked
}

fn first_json_array(text: &str) -> Option<Vec<Value>> {
    text.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Vec<Value>>()
            .next()
            .and_then(|parsed| parsed.ok())
    })
}

/// Insight window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Weekly,
    Monthly,
}

impl Period {
    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value.trim().to_lowercase().as_str() {
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            other => Err(ApiError::invalid(format!(
                "period must be \"weekly\" or \"monthly\", got \"{}\".",
                other
            ))),
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Period::Weekly => "week",
            Period::Monthly => "month",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightsRequest {
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(default)]
    pub manifest: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub period: String,
    pub insights: String,
}

pub fn insights(req: &InsightsRequest, model_override: Option<&str>) -> Result<(Period, CompletionRequest), ApiError> {
    let period = Period::parse(&req.period)?;
    let entries: Vec<&str> = req.entries.iter().map(|e| e.trim()).filter(|e| !e.is_empty()).collect();
    if entries.is_empty() {
        return Err(ApiError::invalid("entries must contain at least one non-empty entry."));
    }

    let mut prompt = format!(
        "Here are my journal entries from the past {}. Offer a short, warm summary of the themes you notice, \
         one thing I seem to be growing in, and one small practical step for the coming {}.\n\n",
        period.noun(),
        period.noun()
    );
    if let Some(manifest) = req.manifest.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        prompt.push_str(&format!("My manifest statement: \"{}\"\n\n", manifest));
    }
    for (i, entry) in entries.iter().enumerate() {
        prompt.push_str(&format!("Entry {}:\n{}\n\n", i + 1, truncate_string(entry, MAX_EXCERPT_CHARS)));
    }

    let request = INSIGHTS
        .request(model_override)
        .message(ChatMessage::system(SOPHY_SYSTEM_PROMPT))
        .message(ChatMessage::user(prompt.trim_end()));
    Ok((period, request))
}
