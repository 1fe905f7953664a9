//! User CRUD endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::user::{validate_user_fields, validate_user_id, User};
use crate::domain::DomainError;

/// List users response
#[derive(Debug, Clone, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    pub total: usize,
}

fn check_id(id: &str) -> Result<(), ApiError> {
    validate_user_id(id).map_err(|e| ApiError::from(DomainError::from(e)))
}

fn check_fields(user: &User) -> Result<(), ApiError> {
    validate_user_fields(&user.name, &user.email).map_err(|e| ApiError::from(DomainError::from(e)))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(user): Json<User>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    check_fields(&user)?;
    debug!(name = %user.name, "Creating user");

    let created = state.user_service.create(user).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let users = state.user_service.get_all().await?;
    let total = users.len();

    Ok(Json(ListUsersResponse { users, total }))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    check_id(&id)?;

    let user = state.user_service.get(&id).await?;

    Ok(Json(user))
}

/// PUT /api/users/{id}
///
/// The path identity wins over any `id` in the body.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(user): Json<User>,
) -> Result<Json<User>, ApiError> {
    check_id(&id)?;
    check_fields(&user)?;
    debug!(id = %id, "Updating user");

    let user = user.with_id(id);
    state.user_service.update(user.clone()).await?;

    Ok(Json(user))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    check_id(&id)?;
    debug!(id = %id, "Deleting user");

    state.user_service.delete(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}
