//! Router tests
//!
//! Requests go through the full router with `oneshot`; the completion
//! provider is replaced by a scripted transport so upstream failures can be
//! staged exactly. Retry tests run on tokio's paused clock.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use sophy_client::{
        CompletionRequest, CompletionTransport, Invoker, RetryPolicy, TransportError, TransportResponse,
    };
    use tower::ServiceExt;

    use crate::cors::DEFAULT_ALLOWED_ORIGINS;
    use crate::{create_router, AppState};

    enum Step {
        Text(&'static str),
        Status(u16),
        Body(&'static str),
        Hang,
    }

    /// Replays one step per call and keeps every request it was sent
    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn last_request(&self) -> CompletionRequest {
            self.seen.lock().unwrap().last().cloned().expect("no request was sent")
        }
    }

    #[async_trait]
    impl CompletionTransport for ScriptedTransport {
        async fn send(&self, request: &CompletionRequest) -> Result<TransportResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            let step = self.steps.lock().unwrap().pop_front();

            match step {
                Some(Step::Text(text)) => {
                    let body = json!({"choices": [{"message": {"role": "assistant", "content": text}}]});
                    Ok(TransportResponse::new(200, body.to_string()))
                }
                Some(Step::Status(status)) => Ok(TransportResponse::new(status, r#"{"error":{"message":"upstream"}}"#)),
                Some(Step::Body(body)) => Ok(TransportResponse::new(200, body)),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(TransportError::new("unreachable"))
                }
                None => panic!("transport called more times than scripted"),
            }
        }

        fn target(&self) -> &str {
            "scripted://completions"
        }
    }

    fn app_with(transport: &Arc<ScriptedTransport>, model_override: Option<&str>) -> Router {
        let invoker = Invoker::new(transport.clone(), RetryPolicy::default());
        let state = AppState::new(Arc::new(invoker), model_override.map(str::to_string));
        let origins: Vec<String> = DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect();
        create_router(Arc::new(state), &origins)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let transport = ScriptedTransport::new(vec![]);
        let (status, body) = send(
            app_with(&transport, None),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service_name"], "sophy-service");
        assert_eq!(body["max_attempts"], 3);
        assert_eq!(body["attempt_timeout_secs"], 20);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_prompt() {
        let transport = ScriptedTransport::new(vec![Step::Text("  What made you smile today?\n")]);

        let (status, body) = send(
            app_with(&transport, None),
            post_json("/generatePrompt", json!({"topic": "joy"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"prompt": "What made you smile today?"}));

        let sent = transport.last_request();
        assert_eq!(sent.model_id(), "gpt-3.5-turbo");
        assert_eq!(sent.messages()[0].content, "Give me a journaling prompt about: joy");
    }

    #[tokio::test]
    async fn test_model_override_applies_to_every_task() {
        let transport = ScriptedTransport::new(vec![Step::Text("A gentle reflection.")]);

        let (status, body) = send(
            app_with(&transport, Some("claude-3-5-sonnet-latest")),
            post_json("/askSophy", json!({"entry": "I slept badly."})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["insight"], "A gentle reflection.");
        assert_eq!(transport.last_request().model_id(), "claude-3-5-sonnet-latest");
    }

    #[tokio::test]
    async fn test_blank_entry_rejected_without_outbound_call() {
        let transport = ScriptedTransport::new(vec![]);

        let (status, body) = send(app_with(&transport, None), post_json("/askSophy", json!({"entry": "   "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
        assert_eq!(body["retryable"], false);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_argument() {
        let transport = ScriptedTransport::new(vec![]);
        let request = Request::builder()
            .method("POST")
            .uri("/refineManifest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"statement\": "))
            .unwrap();

        let (status, body) = send(app_with(&transport, None), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_upstream_maps_to_429() {
        let transport = ScriptedTransport::new(vec![Step::Status(429), Step::Status(429), Step::Status(429)]);

        let (status, body) = send(
            app_with(&transport, None),
            post_json("/refineManifest", json!({"statement": "Live with intention"})),
        )
        .await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "rate_limited");
        assert_eq!(body["retryable"], true);
        assert_eq!(body["attempts"], 3);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let transport = ScriptedTransport::new(vec![Step::Status(503), Step::Text("Cleaned text.")]);

        let (status, body) = send(
            app_with(&transport, None),
            post_json("/cleanTranscript", json!({"transcript": "um cleaned uh text"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleaned"], "Cleaned text.");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_status_mapping() {
        let cases = [
            (vec![Step::Status(401)], StatusCode::INTERNAL_SERVER_ERROR, "unauthorized", 1),
            (vec![Step::Status(400)], StatusCode::INTERNAL_SERVER_ERROR, "invalid_request", 1),
            (
                vec![Step::Status(502), Step::Status(503), Step::Status(500)],
                StatusCode::BAD_GATEWAY,
                "server_error",
                3,
            ),
            (vec![Step::Hang, Step::Hang, Step::Hang], StatusCode::GATEWAY_TIMEOUT, "timeout", 3),
        ];

        for (steps, expected_status, expected_code, expected_attempts) in cases {
            let transport = ScriptedTransport::new(steps);
            let (status, body) = send(
                app_with(&transport, None),
                post_json("/askSophy", json!({"entry": "Today felt heavy."})),
            )
            .await;

            assert_eq!(status, expected_status);
            assert_eq!(body["code"], expected_code);
            assert_eq!(body["attempts"], expected_attempts);
            assert!(!body["error"].as_str().unwrap().contains("upstream"));
        }
    }

    #[tokio::test]
    async fn test_completion_without_text_is_reported() {
        let transport = ScriptedTransport::new(vec![Step::Body(r#"{"choices":[]}"#)]);

        let (status, body) = send(
            app_with(&transport, None),
            post_json("/askSophy", json!({"entry": "Quiet evening."})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "unknown");
        assert_eq!(body["attempts"], 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rank_entries() {
        let transport = ScriptedTransport::new(vec![Step::Text("[\"e3\", \"e1\"]")]);

        let (status, body) = send(
            app_with(&transport, None),
            post_json(
                "/rankEntries",
                json!({
                    "query": "feeling grounded",
                    "entries": [
                        {"id": "e1", "text": "Morning walk by the sea"},
                        {"id": "e2", "text": "Busy day at work"},
                        {"id": "e3", "text": "Meditated and felt calm"}
                    ]
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ranked": ["e3", "e1", "e2"]}));
        assert_eq!(transport.last_request().sampling_temperature(), Some(0.0));
    }

    #[tokio::test]
    async fn test_generate_insights() {
        let transport = ScriptedTransport::new(vec![Step::Text("You kept showing up for yourself.")]);

        let (status, body) = send(
            app_with(&transport, None),
            post_json(
                "/generateInsights",
                json!({"period": "weekly", "entries": ["Walked daily.", "Called my sister."]}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["period"], "weekly");
        assert_eq!(body["insights"], "You kept showing up for yourself.");
    }

    #[tokio::test]
    async fn test_cors_preflight_allow_list() {
        let transport = ScriptedTransport::new(vec![]);
        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/askSophy")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap()
        };

        let resp = app_with(&transport, None)
            .oneshot(preflight("https://inkwelljournal.io"))
            .await
            .unwrap();
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://inkwelljournal.io"
        );

        let resp = app_with(&transport, None)
            .oneshot(preflight("https://evil.example"))
            .await
            .unwrap();
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let transport = ScriptedTransport::new(vec![]);
        let body = json!({"entry": "a".repeat(crate::MAX_PAYLOAD_SIZE + 1)}).to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/askSophy")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let resp = app_with(&transport, None).oneshot(request).await.unwrap();

        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(transport.calls(), 0);
    }
}
