// sophy-service-rs/src/main.rs
// HTTP entry point for InkWell's AI-backed journaling features

use std::sync::Arc;

use anyhow::Context;
use sophy_client::ClientConfig;
use sophy_service::{
    cors,
    logging::{self, LogFormat},
    AppState,
};

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    let service_name = config_rs::get_formatted_service_name("SOPHY");
    logging::init_logging(&service_name, LogFormat::from_env())?;

    let config = ClientConfig::from_env().context("Failed to load completion client configuration")?;
    tracing::info!(
        provider = %config.provider,
        endpoint = %config.endpoint,
        model_override = ?config.default_model,
        policy = %config.retry_policy(),
        "completion client configured"
    );

    let state = Arc::new(AppState::from_config(&config).context("Failed to build completion client")?);

    let origins = cors::allowed_origins_from_env();
    tracing::info!(?origins, "CORS allow-list");

    let app = sophy_service::create_router(state, &origins);

    let addr = config_rs::get_bind_address("SOPHY", DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("{} listening on {}", service_name, addr);
    axum::serve(listener, app).await?;

    Ok(())
}
