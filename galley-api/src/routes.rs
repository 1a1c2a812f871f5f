//! API route configuration.

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use galley_core::types::ResultEnvelope;

use crate::handlers;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ResultEnvelope::error("Something broke!")),
    )
        .into_response()
}

/// Creates the API router with all routes configured.
///
/// Everything under `/api` is rate limited per client; `/health` is not.
pub fn create_router(state: Arc<AppState>) -> Router {
    let ai = Router::new()
        // Menu
        .route("/menu/recommendations", post(handlers::menu_recommendations))
        .route("/menu/optimize-item", post(handlers::optimize_menu_item))
        .route("/menu/describe-item", post(handlers::describe_menu_item))

        // Inventory
        .route("/inventory/predict", post(handlers::predict_inventory))
        .route("/inventory/optimize-reorder-points", post(handlers::optimize_reorder_points))
        .route("/inventory/analyze-waste", post(handlers::analyze_waste))

        // Labor
        .route("/labor/optimize-schedule", post(handlers::optimize_schedule))
        .route("/labor/predict-staffing", post(handlers::predict_staffing))
        .route("/labor/analyze-costs", post(handlers::analyze_labor_costs))

        // Compliance
        .route("/compliance/analyze-inspection", post(handlers::analyze_inspection))
        .route("/compliance/plan", post(handlers::compliance_plan))
        .route("/compliance/assess-risk", post(handlers::assess_risk))

        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", ai)
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use galley_core::traits::CompletionClient;
    use galley_core::types::{Completion, ModelProfile, PromptContext};

    use crate::rate_limit::RateLimitConfig;
    use crate::state::ApiConfig;

    /// Completion client that answers from a script and counts calls.
    struct ScriptedClient {
        reply: Completion,
        delay: Duration,
        panics: bool,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn replying(reply: Completion) -> Arc<Self> {
            Arc::new(Self {
                reply,
                delay: Duration::ZERO,
                panics: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(reply: Completion, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply,
                delay,
                panics: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn panicking() -> Arc<Self> {
            Arc::new(Self {
                reply: Completion::Failure { error: String::new() },
                delay: Duration::ZERO,
                panics: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _profile: &ModelProfile, _context: &PromptContext) -> Completion {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panics {
                panic!("scripted client fault");
            }
            self.reply.clone()
        }
    }

    fn success(text: &str) -> Completion {
        Completion::Success { text: text.into() }
    }

    fn test_app(client: Arc<ScriptedClient>, config: ApiConfig) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::with_client(config, client));
        (create_router(state.clone()), state)
    }

    fn inventory_body() -> Value {
        json!({
            "currentInventory": [
                {"name": "Tomatoes", "sku": "VEG-TOM-001", "quantity": 50, "reorder_point": 20, "optimal_quantity": 100}
            ],
            "historicalTransactions": [
                {"type": "used", "quantity": 50, "transaction_date": "2026-06-01T08:00:00Z"}
            ],
            "upcomingEvents": [
                {"date": "2026-07-04T18:00:00Z", "type": "festival", "expected_attendance": 500}
            ]
        })
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        post_json_from(uri, body, [203, 0, 113, 10])
    }

    /// A POST as it arrives from `peer` through `into_make_service_with_connect_info`.
    fn post_json_from(uri: &str, body: &Value, peer: [u8; 4]) -> Request<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 50_000))));
        request
    }

    fn empty_inventory_body() -> Value {
        json!({"currentInventory": [], "historicalTransactions": [], "upcomingEvents": []})
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = test_app(ScriptedClient::replying(success("ok")), ApiConfig::default());

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cache"]["total_entries"], 0);
    }

    #[tokio::test]
    async fn test_success_is_cached_and_served_from_cache() {
        let client = ScriptedClient::replying(success("Order 80 kg of tomatoes"));
        let (app, state) = test_app(client.clone(), ApiConfig::default());

        let (status, first) = send(&app, post_json("/api/inventory/predict", &inventory_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, json!({"status": "success", "data": "Order 80 kg of tomatoes"}));

        let (status, second) = send(&app, post_json("/api/inventory/predict", &inventory_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second, first);
        assert_eq!(client.calls(), 1);
        assert_eq!(state.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_cached() {
        let client = ScriptedClient::replying(Completion::Failure {
            error: "AI API error: Service Unavailable".into(),
        });
        let (app, state) = test_app(client.clone(), ApiConfig::default());

        let (status, body) = send(&app, post_json("/api/inventory/predict", &inventory_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "AI API error: Service Unavailable");
        assert!(body.get("data").is_none());
        assert!(state.cache.is_empty());

        let (status, _) = send(&app, post_json("/api/inventory/predict", &inventory_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_inventory_failure_is_not_cached() {
        let client = ScriptedClient::replying(Completion::Failure {
            error: "AI API error: Bad Gateway".into(),
        });
        let (app, state) = test_app(client.clone(), ApiConfig::default());

        let (status, body) =
            send(&app, post_json("/api/inventory/predict", &empty_inventory_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert!(!body["message"].as_str().unwrap().trim().is_empty());
        assert!(state.cache.is_empty());

        let (status, _) =
            send(&app, post_json("/api/inventory/predict", &empty_inventory_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_miss_is_counted_once() {
        let client = ScriptedClient::replying(success("plan"));
        let (app, state) = test_app(client, ApiConfig::default());

        let body = json!({"violations": [], "tasks": []});
        send(&app, post_json("/api/compliance/plan", &body)).await;

        let stats = state.cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);

        send(&app, post_json("/api/compliance/plan", &body)).await;
        let stats = state.cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_key_order_does_not_change_fingerprint() {
        let client = ScriptedClient::replying(success("plan"));
        let (app, _) = test_app(client.clone(), ApiConfig::default());

        let a = json!({"violations": [], "tasks": []});
        let b: Value = serde_json::from_str(r#"{"tasks": [], "violations": []}"#).unwrap();

        send(&app, post_json("/api/compliance/plan", &a)).await;
        send(&app, post_json("/api/compliance/plan", &b)).await;
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_same_body_different_operation_is_distinct() {
        let client = ScriptedClient::replying(success("text"));
        let (app, state) = test_app(client.clone(), ApiConfig::default());

        let item = json!({"item": {
            "name": "Risotto",
            "description": "Creamy rice",
            "price": 18,
            "category": "main",
            "allergens": ["dairy"],
            "nutritional_info": {"calories": 650, "protein": 14, "carbs": 80, "fats": 25}
        }});

        send(&app, post_json("/api/menu/optimize-item", &item)).await;
        send(&app, post_json("/api/menu/describe-item", &item)).await;
        assert_eq!(client.calls(), 2);
        assert_eq!(state.cache.len(), 2);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_gateway() {
        let client = ScriptedClient::replying(success("unused"));
        let (app, state) = test_app(client.clone(), ApiConfig::default());

        let (status, body) = send(
            &app,
            post_json("/api/inventory/predict", &json!({"currentInventory": []})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("historicalTransactions"));
        assert_eq!(client.calls(), 0);
        assert!(state.cache.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let client = ScriptedClient::replying(success("unused"));
        let (app, _) = test_app(client.clone(), ApiConfig::default());

        let request = Request::builder()
            .method("POST")
            .uri("/api/labor/optimize-schedule")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_101st_request() {
        let client = ScriptedClient::replying(success("unused"));
        let (app, _) = test_app(client, ApiConfig::default());
        let invalid = json!({});

        for _ in 0..100 {
            let (status, _) = send(&app, post_json("/api/compliance/plan", &invalid)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let response = app
            .clone()
            .oneshot(post_json("/api/compliance/plan", &invalid))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({"status": "error", "message": "Too many requests from this IP, please try again later."})
        );

        // Another client and the health route are unaffected.
        let other = post_json_from("/api/compliance/plan", &invalid, [198, 51, 100, 20]);
        let (status, _) = send(&app, other).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, _) = send(&app, health).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_respects_config() {
        let config = ApiConfig {
            rate_limit: RateLimitConfig {
                max_requests: 2,
                window_seconds: 60,
                trust_proxy: false,
            },
            ..ApiConfig::default()
        };
        let (app, _) = test_app(ScriptedClient::replying(success("ok")), config);

        let body = json!({"violations": [], "tasks": []});
        for expected in [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS] {
            let (status, _) = send(&app, post_json("/api/compliance/plan", &body)).await;
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_evade_limit() {
        let client = ScriptedClient::replying(success("unused"));
        let (app, state) = test_app(client, ApiConfig::default());
        let invalid = json!({});

        for i in 0..101u32 {
            let mut request = post_json_from("/api/compliance/plan", &invalid, [192, 0, 2, 1]);
            let spoofed = format!("10.9.{}.{}", i / 256, i % 256);
            request
                .headers_mut()
                .insert("x-forwarded-for", spoofed.parse().unwrap());
            let (status, _) = send(&app, request).await;

            let expected = if i < 100 {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::TOO_MANY_REQUESTS
            };
            assert_eq!(status, expected, "request {}", i + 1);
        }
        assert_eq!(state.limiter.tracked_clients(), 1);
    }

    #[tokio::test]
    async fn test_trusted_proxy_keys_on_forwarded_for() {
        let config = ApiConfig {
            rate_limit: RateLimitConfig {
                max_requests: 1,
                window_seconds: 60,
                trust_proxy: true,
            },
            ..ApiConfig::default()
        };
        let (app, _) = test_app(ScriptedClient::replying(success("ok")), config);
        let body = json!({"violations": [], "tasks": []});

        // Two clients behind the same proxy peer each get their own window.
        let script = [
            ("203.0.113.1", StatusCode::OK),
            ("203.0.113.2", StatusCode::OK),
            ("203.0.113.1", StatusCode::TOO_MANY_REQUESTS),
        ];
        for (client_ip, expected) in script {
            let mut request = post_json_from("/api/compliance/plan", &body, [10, 0, 0, 1]);
            request
                .headers_mut()
                .insert("x-forwarded-for", client_ip.parse().unwrap());
            let (status, _) = send(&app, request).await;
            assert_eq!(status, expected, "{}", client_ip);
        }
    }

    async fn concurrent_identical_requests(coalesce: bool, n: usize) -> usize {
        let client = ScriptedClient::slow(success("schedule"), Duration::from_millis(100));
        let config = ApiConfig {
            coalesce_requests: coalesce,
            ..ApiConfig::default()
        };
        let (app, _) = test_app(client.clone(), config);

        let mut tasks = Vec::new();
        for _ in 0..n {
            let app = app.clone();
            tasks.push(tokio::spawn(async move {
                send(&app, post_json("/api/inventory/predict", &inventory_body())).await
            }));
        }
        for task in tasks {
            let (status, body) = task.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"], "schedule");
        }
        client.calls()
    }

    #[tokio::test]
    async fn test_concurrent_misses_are_coalesced() {
        assert_eq!(concurrent_identical_requests(true, 5).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_without_coalescing() {
        assert_eq!(concurrent_identical_requests(false, 5).await, 5);
    }

    #[tokio::test]
    async fn test_default_config_calls_upstream_per_miss() {
        let client = ScriptedClient::slow(success("schedule"), Duration::from_millis(100));
        let (app, state) = test_app(client.clone(), ApiConfig::default());

        let requests = (0..3).map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                send(&app, post_json("/api/inventory/predict", &inventory_body())).await
            })
        });
        for task in requests.collect::<Vec<_>>() {
            assert_eq!(task.await.unwrap().0, StatusCode::OK);
        }
        assert_eq!(client.calls(), 3);
        assert_eq!(state.flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_request_releases_its_flight() {
        let client = ScriptedClient::slow(success("schedule"), Duration::from_millis(100));
        let config = ApiConfig {
            coalesce_requests: true,
            ..ApiConfig::default()
        };
        let (app, state) = test_app(client.clone(), config);

        let request = {
            let app = app.clone();
            tokio::spawn(async move {
                send(&app, post_json("/api/inventory/predict", &inventory_body())).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(state.flights.in_flight(), 1);
        request.abort();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(state.flights.in_flight(), 0);
        assert_eq!(state.cache.len(), 1);

        let (status, body) = send(&app, post_json("/api/inventory/predict", &inventory_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "schedule");
        assert_eq!(client.calls(), 1);
        assert_eq!(state.flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_client_fault_becomes_operation_error() {
        let client = ScriptedClient::panicking();
        let (app, state) = test_app(client, ApiConfig::default());

        let (status, body) = send(&app, post_json("/api/inventory/predict", &inventory_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"status": "error", "message": "Failed to predict inventory needs"})
        );
        assert!(state.cache.is_empty());
    }

    #[tokio::test]
    async fn test_panic_outside_pipeline_is_caught() {
        async fn explode() -> &'static str {
            panic!("boom")
        }
        let app: Router = Router::new()
            .route("/explode", get(explode))
            .layer(CatchPanicLayer::custom(handle_panic));

        let request = Request::builder().uri("/explode").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"status": "error", "message": "Something broke!"}));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (app, _) = test_app(ScriptedClient::replying(success("ok")), ApiConfig::default());

        let request = Request::builder().uri("/api/nope").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
    }
}
