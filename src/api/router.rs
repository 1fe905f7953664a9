//! HTTP router assembly

use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::get,
    Router,
};
use tower::{timeout::error::Elapsed, BoxError, ServiceBuilder};
use tower::timeout::TimeoutLayer;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::error;

use super::health;
use super::middleware::{logging_middleware, metrics_middleware, rate_limit_middleware};
use super::state::AppState;
use super::types::ApiError;
use super::users;
use crate::config::AppConfig;
use crate::infrastructure::observability::{create_metrics_router, HttpMetrics};
use crate::infrastructure::rate_limiter::TokenBucket;

/// Router wiring options
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub request_timeout: Duration,
    pub metrics_path: String,
}

impl RouterOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            request_timeout: config.server.request_timeout(),
            metrics_path: config.metrics.path.clone(),
        }
    }
}

/// Create the full application router
///
/// `/api` layers, outermost first: rate limiter, metrics interceptor, request
/// timeout. Health and metrics endpoints are neither limited nor metered, but
/// every route gets a request id, a trace span and request logging.
pub fn create_router(
    state: AppState,
    limiter: Arc<TokenBucket>,
    metrics: Option<HttpMetrics>,
    options: &RouterOptions,
) -> Router {
    let mut api = create_api_router().layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .layer(TimeoutLayer::new(options.request_timeout)),
    );

    if let Some(metrics) = &metrics {
        api = api.layer(middleware::from_fn_with_state(
            metrics.clone(),
            metrics_middleware,
        ));
    }

    let api = api.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .nest("/api", api)
        .with_state(state);

    if let Some(metrics) = metrics {
        router = router.merge(create_metrics_router(metrics, &options.metrics_path));
    }

    router
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(health::ping))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

async fn handle_timeout_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::timeout("Request timed out")
    } else {
        error!(error = %err, "unhandled middleware error");
        ApiError::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;
    use crate::infrastructure::observability::{sample_value, HTTP_REQUESTS_TOTAL};
    use crate::infrastructure::rate_limiter::RateLimitConfig;
    use crate::infrastructure::services::UserService;
    use crate::infrastructure::storage::{StorageConfig, StorageFactory};
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const UNKNOWN_ID: &str = "6f1c1a36-0c5f-4f39-9d8a-4c2c3c0f7b11";

    async fn app_with(limiter: RateLimitConfig, metrics: Option<HttpMetrics>) -> Router {
        let storage = StorageFactory::create::<User>(&StorageConfig::InMemory, "users")
            .await
            .unwrap();
        let state = AppState::new(UserService::new(storage));
        let options = RouterOptions::from_config(&AppConfig::default());

        create_router(state, Arc::new(TokenBucket::new(limiter)), metrics, &options)
    }

    async fn app() -> Router {
        app_with(RateLimitConfig::new(1000.0, 1000), None).await
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_user_crud_flow() {
        let app = app().await;

        let response = send(
            &app,
            request(
                Method::POST,
                "/api/users",
                Some(json!({"id": "ignored", "name": "Ada", "email": "ada@example.com"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_ne!(id, "ignored");
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let response = send(&app, request(Method::GET, &format!("/api/users/{id}"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, created);

        let response = send(&app, request(Method::GET, "/api/users", None)).await;
        let listed = body_json(response).await;
        assert_eq!(listed["total"], 1);
        assert_eq!(listed["users"][0]["id"], id.as_str());

        let response = send(
            &app,
            request(
                Method::PUT,
                &format!("/api/users/{id}"),
                Some(json!({"name": "Ada L.", "email": "ada@example.com"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], id.as_str());

        let response = send(&app, request(Method::GET, &format!("/api/users/{id}"), None)).await;
        assert_eq!(body_json(response).await["name"], "Ada L.");

        for _ in 0..2 {
            let response =
                send(&app, request(Method::DELETE, &format!("/api/users/{id}"), None)).await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        let response = send(&app, request(Method::GET, &format!("/api/users/{id}"), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let app = app().await;

        let response = send(&app, request(Method::GET, "/api/users", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"users": [], "total": 0}));
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let app = app().await;

        let response = send(&app, request(Method::GET, "/api/users/not-a-uuid", None)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["param"], "id");
    }

    #[tokio::test]
    async fn test_missing_email_is_bad_request() {
        let app = app().await;

        let response = send(
            &app,
            request(Method::POST, "/api/users", Some(json!({"name": "Ada", "email": ""}))),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["param"], "email");
    }

    #[tokio::test]
    async fn test_invalid_email_is_bad_request() {
        let app = app().await;

        let response = send(
            &app,
            request(
                Method::POST,
                "/api/users",
                Some(json!({"name": "Ada", "email": "not-an-address"})),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let app = app().await;

        let response = send(
            &app,
            request(
                Method::PUT,
                &format!("/api/users/{UNKNOWN_ID}"),
                Some(json!({"name": "Ghost", "email": "ghost@example.com"})),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["type"], "not_found_error");
    }

    #[tokio::test]
    async fn test_malformed_json_uses_error_envelope() {
        let app = app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/users")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{broken"))
            .unwrap();

        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_rate_limit_applies_only_to_api() {
        let metrics = HttpMetrics::new().unwrap();
        let app = app_with(RateLimitConfig::new(0.0, 0), Some(metrics)).await;

        let response = send(&app, request(Method::GET, "/api/ping", None)).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        for path in ["/health", "/live", "/metrics"] {
            let response = send(&app, request(Method::GET, path, None)).await;
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
    }

    #[tokio::test]
    async fn test_rejected_requests_are_not_metered() {
        let metrics = HttpMetrics::new().unwrap();
        let app = app_with(RateLimitConfig::new(0.0, 1), Some(metrics.clone())).await;

        let first = send(&app, request(Method::GET, "/api/ping", None)).await;
        axum::body::to_bytes(first.into_body(), usize::MAX).await.unwrap();
        let second = send(&app, request(Method::GET, "/api/ping", None)).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let rendered = metrics.render();
        assert_eq!(
            sample_value(&rendered, HTTP_REQUESTS_TOTAL, &[("route", "/api/ping")]),
            Some(1.0)
        );
        assert_eq!(
            sample_value(&rendered, HTTP_REQUESTS_TOTAL, &[("status", "429")]),
            None
        );
    }

    #[tokio::test]
    async fn test_metrics_endpoint_exposes_recorded_routes() {
        let metrics = HttpMetrics::new().unwrap();
        let app = app_with(RateLimitConfig::new(1000.0, 1000), Some(metrics)).await;

        let response = send(&app, request(Method::GET, "/api/users", None)).await;
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let response = send(&app, request(Method::GET, "/metrics", None)).await;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rendered = String::from_utf8(bytes.to_vec()).unwrap();

        assert_eq!(
            sample_value(
                &rendered,
                HTTP_REQUESTS_TOTAL,
                &[("method", "GET"), ("route", "/api/users"), ("status", "200")]
            ),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_request_id_is_generated_and_propagated() {
        let app = app().await;

        let generated = send(&app, request(Method::GET, "/health", None)).await;
        let id = generated.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());

        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "trace-me")
            .body(Body::empty())
            .unwrap();
        let echoed = send(&app, request).await;
        assert_eq!(echoed.headers()["x-request-id"], "trace-me");
    }

    #[tokio::test]
    async fn test_metrics_scrape_gets_request_id() {
        let metrics = HttpMetrics::new().unwrap();
        let app = app_with(RateLimitConfig::new(1000.0, 1000), Some(metrics)).await;

        let request = Request::builder()
            .uri("/metrics")
            .header("x-request-id", "scrape-1")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "scrape-1");
    }

    #[tokio::test]
    async fn test_timeout_error_maps_to_request_timeout() {
        let response = handle_timeout_error(Box::new(Elapsed::new())).await;
        assert_eq!(response.status, StatusCode::REQUEST_TIMEOUT);

        let response = handle_timeout_error("boom".into()).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
