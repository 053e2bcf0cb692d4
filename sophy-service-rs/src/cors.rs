//! CORS allow-list for the journal front end

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Origins served when `INKWELL_ALLOWED_ORIGINS` is unset
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "https://inkwelljournal.io",
    "https://www.inkwelljournal.io",
    "http://localhost:5000",
    "http://localhost:5001",
];

/// Parse a comma-separated origin list, skipping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Allowed origins from the environment, or the defaults
pub fn allowed_origins_from_env() -> Vec<String> {
    match std::env::var("INKWELL_ALLOWED_ORIGINS") {
        Ok(raw) if !parse_origins(&raw).is_empty() => parse_origins(&raw),
        _ => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
    }
}

/// Build the CORS layer; origins that are not valid header values are skipped
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://inkwelljournal.io/ ,,http://localhost:5000"),
            vec!["https://inkwelljournal.io", "http://localhost:5000"]
        );
        assert!(parse_origins(" , ").is_empty());
    }
}
