//! # Structured Logging
//!
//! Installs the global tracing subscriber. `log` records from the client
//! crates are bridged into it, so one filter governs both.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `INKWELL_LOG_FORMAT=json` selects JSON, anything else plain text
    pub fn from_env() -> Self {
        match std::env::var("INKWELL_LOG_FORMAT") {
            Ok(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Initializes logging for the service. `RUST_LOG` overrides the default filter.
pub fn init_logging(service_name: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,hyper=warn,reqwest=warn"));

    let json_layer = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
    });
    let text_layer = (format == LogFormat::Text).then(|| fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    tracing::info!(service = %service_name, ?format, "logging initialized");
    Ok(())
}
