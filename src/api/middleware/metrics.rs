//! HTTP metrics middleware for recording request outcomes
//!
//! Every request produces exactly one observation. The outcome is finalized
//! when the response body has been fully streamed, or when the response (or
//! the request future itself) is dropped before that.

use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use http_body::{Frame, SizeHint};
use tracing::error;

use crate::api::types::ApiError;
use crate::infrastructure::observability::HttpMetrics;

/// First-write-wins holder for a response status
///
/// Zero means no status has been recorded yet.
#[derive(Debug, Default)]
pub struct StatusCapture(AtomicU16);

impl StatusCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` unless one was already recorded
    ///
    /// Returns true when this call won.
    pub fn record(&self, status: u16) -> bool {
        status != 0
            && self
                .0
                .compare_exchange(0, status, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    pub fn get(&self) -> Option<u16> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            status => Some(status),
        }
    }
}

/// One in-flight request; reports its outcome exactly once, on drop
#[derive(Debug)]
pub struct RequestObservation {
    metrics: HttpMetrics,
    method: String,
    route: String,
    status: Arc<StatusCapture>,
    start: Instant,
}

impl RequestObservation {
    pub fn start(metrics: HttpMetrics, method: String, route: String) -> Self {
        metrics.request_started();

        Self {
            metrics,
            method,
            route,
            status: Arc::new(StatusCapture::new()),
            start: Instant::now(),
        }
    }

    pub fn status(&self) -> &StatusCapture {
        &self.status
    }
}

impl Drop for RequestObservation {
    fn drop(&mut self) {
        self.metrics.request_finished(
            &self.method,
            &self.route,
            self.status.get(),
            self.start.elapsed(),
        );
    }
}

/// Response body that carries the observation until streaming ends
struct ObservedBody {
    inner: Body,
    observation: Option<RequestObservation>,
}

impl http_body::Body for ObservedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.observation.take();
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Middleware to record HTTP request metrics
pub async fn metrics_middleware(
    State(metrics): State<HttpMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = extract_route(&request);
    let observation = RequestObservation::start(metrics, method, route);

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => {
            observation.status().record(response.status().as_u16());

            let (parts, body) = response.into_parts();
            let body = ObservedBody {
                inner: body,
                observation: Some(observation),
            };
            Response::from_parts(parts, Body::new(body))
        }
        Err(_) => {
            error!(
                method = %observation.method,
                route = %observation.route,
                "handler panicked"
            );
            drop(observation);
            ApiError::internal("Internal server error").into_response()
        }
    }
}

/// Matched route template, falling back to the raw path for unmatched requests
fn extract_route(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::observability::{
        sample_value, HTTP_ACTIVE_REQUESTS, HTTP_ERRORS_TOTAL, HTTP_REQUESTS_TOTAL,
    };
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use futures::stream;
    use std::convert::Infallible;
    use tower::ServiceExt;

    fn app(metrics: &HttpMetrics) -> Router {
        Router::new()
            .route("/ok", get(|| async { "pong" }))
            .route("/missing/{id}", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/chunked",
                get(|| async {
                    let chunks = vec![
                        Ok::<_, Infallible>(Bytes::from_static(b"first ")),
                        Ok(Bytes::from_static(b"second")),
                    ];
                    Body::from_stream(stream::iter(chunks))
                }),
            )
            .route(
                "/panic",
                get(|| async {
                    if true {
                        panic!("handler failure");
                    }
                    "unreachable"
                }),
            )
            .layer(middleware::from_fn_with_state(
                metrics.clone(),
                metrics_middleware,
            ))
    }

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_status_capture_first_write_wins() {
        let capture = StatusCapture::new();

        assert_eq!(capture.get(), None);
        assert!(capture.record(201));
        assert!(!capture.record(500));
        assert_eq!(capture.get(), Some(201));
    }

    #[test]
    fn test_status_capture_ignores_zero() {
        let capture = StatusCapture::new();

        assert!(!capture.record(0));
        assert_eq!(capture.get(), None);
    }

    #[test]
    fn test_status_capture_concurrent_writers() {
        let capture = Arc::new(StatusCapture::new());

        let handles: Vec<_> = (200..216)
            .map(|status| {
                let capture = Arc::clone(&capture);
                std::thread::spawn(move || capture.record(status))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(capture.get().is_some());
    }

    #[tokio::test]
    async fn test_records_matched_route_and_status() {
        let metrics = HttpMetrics::new().unwrap();

        let response = app(&metrics)
            .oneshot(get_request("/missing/42"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let rendered = metrics.render();
        let labels = [("route", "/missing/{id}"), ("status", "404")];
        assert_eq!(sample_value(&rendered, HTTP_REQUESTS_TOTAL, &labels), Some(1.0));
        assert_eq!(
            sample_value(&rendered, HTTP_ERRORS_TOTAL, &[("error_type", "404")]),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_two_chunk_body_counted_once() {
        let metrics = HttpMetrics::new().unwrap();

        let response = app(&metrics)
            .oneshot(get_request("/chunked"))
            .await
            .unwrap();

        // Still streaming: nothing recorded yet
        assert_eq!(sample_value(&metrics.render(), HTTP_REQUESTS_TOTAL, &[]), None);
        assert_eq!(
            sample_value(&metrics.render(), HTTP_ACTIVE_REQUESTS, &[]),
            Some(1.0)
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"first second");

        let rendered = metrics.render();
        assert_eq!(
            sample_value(&rendered, HTTP_REQUESTS_TOTAL, &[("route", "/chunked")]),
            Some(1.0)
        );
        assert_eq!(
            sample_value(&rendered, HTTP_REQUESTS_TOTAL, &[("status", "200")]),
            Some(1.0)
        );
        assert_eq!(sample_value(&rendered, HTTP_ACTIVE_REQUESTS, &[]), Some(0.0));
    }

    #[tokio::test]
    async fn test_dropped_response_is_still_recorded() {
        let metrics = HttpMetrics::new().unwrap();

        let response = app(&metrics).oneshot(get_request("/ok")).await.unwrap();
        drop(response);

        let rendered = metrics.render();
        assert_eq!(
            sample_value(&rendered, HTTP_REQUESTS_TOTAL, &[("status", "200")]),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn test_panicking_handler_records_no_status() {
        let metrics = HttpMetrics::new().unwrap();

        let response = app(&metrics).oneshot(get_request("/panic")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let rendered = metrics.render();
        assert_eq!(
            sample_value(&rendered, HTTP_REQUESTS_TOTAL, &[("route", "/panic")]),
            Some(1.0)
        );
        assert_eq!(
            sample_value(&rendered, HTTP_ERRORS_TOTAL, &[("error_type", "no_status")]),
            Some(1.0)
        );
        assert_eq!(sample_value(&rendered, HTTP_ACTIVE_REQUESTS, &[]), Some(0.0));
    }

    #[tokio::test]
    async fn test_unmatched_path_uses_raw_path() {
        let metrics = HttpMetrics::new().unwrap();
        let router = Router::new()
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn_with_state(
                metrics.clone(),
                metrics_middleware,
            ));

        let response = router.oneshot(get_request("/nowhere")).await.unwrap();
        drop(response);

        assert_eq!(
            sample_value(&metrics.render(), HTTP_REQUESTS_TOTAL, &[("route", "/nowhere")]),
            Some(1.0)
        );
    }
}
