//! JSON extractor whose rejections use the API error envelope

use axum::{
    extract::{rejection::JsonRejection as AxumJsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;

use super::error::{ApiError, ApiErrorType};

/// Wrapper around `axum::Json` that reports malformed bodies as [`ApiError`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        AxumJson::<T>::from_request(req, state)
            .await
            .map(|AxumJson(value)| Json(value))
            .map_err(|rejection| rejection_to_error(&rejection))
    }
}

/// Keep axum's status (400, 415, 422) but render our envelope
fn rejection_to_error(rejection: &AxumJsonRejection) -> ApiError {
    let (message, code) = match rejection {
        AxumJsonRejection::JsonDataError(err) => (
            format!("Invalid JSON data: {}", err.body_text()),
            "json_data_error",
        ),
        AxumJsonRejection::JsonSyntaxError(err) => (
            format!("Invalid JSON syntax: {}", err.body_text()),
            "json_syntax_error",
        ),
        AxumJsonRejection::MissingJsonContentType(_) => (
            "Missing Content-Type header. Expected 'application/json'.".to_string(),
            "missing_content_type",
        ),
        AxumJsonRejection::BytesRejection(err) => (
            format!("Failed to read request body: {}", err.body_text()),
            "body_read_error",
        ),
        _ => ("Invalid JSON request".to_string(), "json_parse_error"),
    };

    ApiError::new(rejection.status(), ApiErrorType::InvalidRequestError, message).with_code(code)
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}
