//! Token-bucket admission control for the API surface

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::types::ApiError;
use crate::infrastructure::rate_limiter::TokenBucket;

/// Reject the request with 429 when the shared bucket is empty
///
/// Rejected requests never reach the inner layers.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<TokenBucket>>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.allow() {
        return next.run(request).await;
    }

    warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "rate limit exceeded"
    );

    let mut response = ApiError::rate_limited("Too many requests").into_response();
    if let Some(wait) = limiter.retry_after() {
        let seconds = wait.as_secs().saturating_add(u64::from(wait.subsec_nanos() > 0));
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(seconds.max(1)));
    }
    response
}
