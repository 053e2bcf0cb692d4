//! Route handlers
//!
//! Each handler validates its JSON body, builds the task's completion request
//! and runs it through the shared invoker. Failures become `ApiError`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::tasks::{
    self, InsightsRequest, InsightsResponse, ManifestRequest, ManifestResponse, PromptRequest, PromptResponse,
    RankRequest, RankResponse, ReflectionRequest, ReflectionResponse, TranscriptRequest, TranscriptResponse,
};
use crate::{AppState, START_TIME};

type Payload<T> = Result<Json<T>, JsonRejection>;

/// POST /generatePrompt
pub async fn generate_prompt(
    State(state): State<Arc<AppState>>,
    payload: Payload<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let Json(req) = payload?;
    tracing::info!(topic = ?req.topic, "prompt request");

    let request = tasks::journal_prompt(&req, state.model_override());
    let prompt = state.invoker.invoke_text(&request, tasks::JOURNAL_PROMPT.label).await?;
    Ok(Json(PromptResponse { prompt }))
}

/// POST /askSophy
pub async fn ask_sophy(
    State(state): State<Arc<AppState>>,
    payload: Payload<ReflectionRequest>,
) -> Result<Json<ReflectionResponse>, ApiError> {
    let Json(req) = payload?;
    let request = tasks::reflection(&req, state.model_override())?;

    let insight = state.invoker.invoke_text(&request, tasks::REFLECTION.label).await?;
    Ok(Json(ReflectionResponse { insight }))
}

/// POST /refineManifest
pub async fn refine_manifest(
    State(state): State<Arc<AppState>>,
    payload: Payload<ManifestRequest>,
) -> Result<Json<ManifestResponse>, ApiError> {
    let Json(req) = payload?;
    let request = tasks::manifest(&req, state.model_override())?;

    let refined = state.invoker.invoke_text(&request, tasks::MANIFEST.label).await?;
    Ok(Json(ManifestResponse { refined }))
}

/// POST /cleanTranscript
pub async fn clean_transcript(
    State(state): State<Arc<AppState>>,
    payload: Payload<TranscriptRequest>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let Json(req) = payload?;
    let request = tasks::transcript_cleanup(&req, state.model_override())?;

    let cleaned = state.invoker.invoke_text(&request, tasks::TRANSCRIPT_CLEANUP.label).await?;
    Ok(Json(TranscriptResponse { cleaned }))
}

/// POST /rankEntries
pub async fn rank_entries(
    State(state): State<Arc<AppState>>,
    payload: Payload<RankRequest>,
) -> Result<Json<RankResponse>, ApiError> {
    let Json(req) = payload?;
    let request = tasks::ranking(&req, state.model_override())?;

    let text = state.invoker.invoke_text(&request, tasks::RANKING.label).await?;
    let ranked = tasks::parse_ranking(&text, &req.entries);
    tracing::debug!(count = ranked.len(), "ranked entries");
    Ok(Json(RankResponse { ranked }))
}

/// POST /generateInsights
pub async fn generate_insights(
    State(state): State<Arc<AppState>>,
    payload: Payload<InsightsRequest>,
) -> Result<Json<InsightsResponse>, ApiError> {
    let Json(req) = payload?;
    let (period, request) = tasks::insights(&req, state.model_override())?;

    let insights = state.invoker.invoke_text(&request, tasks::INSIGHTS.label).await?;
    let period = match period {
        tasks::Period::Weekly => "weekly",
        tasks::Period::Monthly => "monthly",
    };
    Ok(Json(InsightsResponse {
        period: period.to_string(),
        insights,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub uptime_seconds: u64,
    pub status: String,
    pub max_attempts: u32,
    pub attempt_timeout_secs: u64,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let policy = state.invoker.policy();
    Json(HealthResponse {
        healthy: true,
        service_name: config_rs::get_formatted_service_name("SOPHY"),
        uptime_seconds: START_TIME.elapsed().as_secs(),
        status: "SERVING".to_string(),
        max_attempts: policy.max_attempts,
        attempt_timeout_secs: policy.attempt_timeout.as_secs(),
    })
}
