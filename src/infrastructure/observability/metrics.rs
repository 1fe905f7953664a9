//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_ACTIVE_REQUESTS: &str = "http_active_requests";
pub const HTTP_ERRORS_TOTAL: &str = "http_errors_total";

/// Prometheus default histogram buckets, in seconds
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Per-instance HTTP metrics registry
///
/// The recorder is never installed globally; every recording goes through
/// this handle, so independent instances do not share series.
#[derive(Clone)]
pub struct HttpMetrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetrics").finish_non_exhaustive()
    }
}

impl HttpMetrics {
    /// Build a fresh registry with the HTTP series described
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
                DURATION_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        let metrics = Self {
            recorder: Arc::new(recorder),
            handle,
        };
        metrics.register_default_metrics();

        Ok(metrics)
    }

    fn register_default_metrics(&self) {
        self.with_recorder(|| {
            describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
            describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "Request duration in seconds");
            describe_gauge!(HTTP_ACTIVE_REQUESTS, "Number of active HTTP requests");
            describe_counter!(HTTP_ERRORS_TOTAL, "Total number of HTTP errors");

            gauge!(HTTP_ACTIVE_REQUESTS).set(0.0);
            gauge!("entity_store_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
        });
    }

    fn with_recorder<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self.recorder.as_ref(), f)
    }

    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Mark a request as in flight
    pub fn request_started(&self) {
        self.with_recorder(|| gauge!(HTTP_ACTIVE_REQUESTS).increment(1.0));
    }

    /// Record the outcome of a finished request
    ///
    /// `status` is `None` when the handler never produced a response.
    pub fn request_finished(
        &self,
        method: &str,
        route: &str,
        status: Option<u16>,
        duration: Duration,
    ) {
        let status_label = status.unwrap_or(0).to_string();

        self.with_recorder(|| {
            gauge!(HTTP_ACTIVE_REQUESTS).decrement(1.0);

            let labels = [
                ("method", method.to_string()),
                ("route", route.to_string()),
                ("status", status_label.clone()),
            ];
            counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);

            let labels = [("method", method.to_string()), ("route", route.to_string())];
            histogram!(HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration.as_secs_f64());

            let error_type = match status {
                Some(code) if code >= 400 => Some(status_label),
                Some(_) => None,
                None => Some("no_status".to_string()),
            };

            if let Some(error_type) = error_type {
                let labels = [
                    ("method", method.to_string()),
                    ("route", route.to_string()),
                    ("error_type", error_type),
                ];
                counter!(HTTP_ERRORS_TOTAL, &labels).increment(1);
            }
        });
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: HttpMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<HttpMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Reads one sample from rendered exposition text
///
/// Matches the first line of `name` whose labels contain every `key="value"`
/// fragment in `labels`.
#[cfg(test)]
pub(crate) fn sample_value(rendered: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .find(|line| {
            labels
                .iter()
                .all(|(key, value)| line.contains(&format!("{}=\"{}\"", key, value)))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
