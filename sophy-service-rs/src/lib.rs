//! # Sophy Service
//!
//! HTTP endpoints behind InkWell's AI-backed journaling features. Every
//! handler shares one `Invoker`, so retries, timeouts and error
//! classification behave the same across features.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use once_cell::sync::Lazy;
use sophy_client::{ClientConfig, Invoker};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod cors;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod tasks;

#[cfg(test)]
mod tests;

pub use error::{ApiError, ErrorResponse};

/// Largest accepted request body
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

pub(crate) static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Shared application state
pub struct AppState {
    pub invoker: Arc<Invoker>,
    model_override: Option<String>,
}

impl AppState {
    pub fn new(invoker: Arc<Invoker>, model_override: Option<String>) -> Self {
        Self { invoker, model_override }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, sophy_client::ConfigError> {
        let invoker = Invoker::from_config(config)?;
        Ok(Self::new(Arc::new(invoker), config.default_model.clone()))
    }

    /// Model replacing every task's default, when configured
    pub fn model_override(&self) -> Option<&str> {
        self.model_override.as_deref()
    }
}

/// Build the router with CORS, body limit and request tracing
pub fn create_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Lazy::force(&START_TIME);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/generatePrompt", post(handlers::generate_prompt))
        .route("/askSophy", post(handlers::ask_sophy))
        .route("/refineManifest", post(handlers::refine_manifest))
        .route("/cleanTranscript", post(handlers::clean_transcript))
        .route("/rankEntries", post(handlers::rank_entries))
        .route("/generateInsights", post(handlers::generate_insights))
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
        .layer(cors::cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
