//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
#[cfg(test)]
pub(crate) use metrics::sample_value;
pub use metrics::{
    create_metrics_router, HttpMetrics, HTTP_ACTIVE_REQUESTS, HTTP_ERRORS_TOTAL,
    HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS,
};
