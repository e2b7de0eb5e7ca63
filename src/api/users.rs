//! Current-user profile and password management.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::auth::{hash_password, verify_password, AuthUser};
use super::error::ApiError;
use crate::db::{self, ChangePasswordRequest, UserResponse};
use crate::AppState;

/// Fetch the authenticated user's profile
///
/// GET /user/me
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let stored = db::users::find_by_id(&state.db, &user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(stored)))
}

/// Change the authenticated user's password
///
/// PUT /user/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if request.new_password.len() < 6 {
        return Err(ApiError::validation(
            "New password must be at least 6 characters",
        ));
    }

    let stored = db::users::find_by_id(&state.db, &user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password(&request.password, &stored.password_hash) {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_password(&request.new_password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;
    db::users::update_password(&state.db, &stored.id, &password_hash).await?;

    Ok(StatusCode::NO_CONTENT)
}
