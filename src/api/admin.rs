//! Admin-only operations across all owners.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::AdminUser;
use super::error::ApiError;
use crate::db::{self, TodoResponse};
use crate::AppState;

/// List every todo, regardless of owner
///
/// GET /admin/todos
pub async fn list_all_todos(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let todos = db::todos::find_all(&state.db).await?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

/// Delete any todo by id
///
/// DELETE /admin/todos/:id
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = db::todos::delete(&state.db, &id).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Todo not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
