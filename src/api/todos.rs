//! Owner-scoped todo CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::db::{self, Todo, TodoRequest, TodoResponse};
use crate::AppState;

fn validate_todo_request(request: &TodoRequest) -> Result<(), ApiError> {
    if request.title.len() < 3 {
        return Err(ApiError::validation("Title must be at least 3 characters"));
    }
    if request.description.is_empty() || request.description.len() > 100 {
        return Err(ApiError::validation(
            "Description must be between 1 and 100 characters",
        ));
    }
    if !(1..=5).contains(&request.priority) {
        return Err(ApiError::validation("Priority must be between 1 and 5"));
    }
    Ok(())
}

/// List the caller's todos
///
/// GET /todos
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let todos = db::todos::find_by_owner(&state.db, &user.id).await?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

/// Create a todo
///
/// POST /todos
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<TodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    validate_todo_request(&request)?;

    let now = chrono::Utc::now().to_rfc3339();
    let todo = Todo {
        id: uuid::Uuid::new_v4().to_string(),
        title: request.title,
        description: request.description,
        priority: request.priority,
        complete: request.complete as i64,
        owner_id: user.id,
        created_at: now.clone(),
        completed_at: if request.complete { Some(now) } else { None },
    };
    db::todos::insert(&state.db, &todo).await?;

    Ok((StatusCode::CREATED, Json(TodoResponse::from(todo))))
}

/// Fetch one of the caller's todos
///
/// GET /todos/:id
pub async fn get_todo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = db::todos::find_by_id(&state.db, &id).await?;

    match todo {
        Some(t) if t.owner_id == user.id => Ok(Json(TodoResponse::from(t))),
        _ => Err(ApiError::not_found("Todo not found")),
    }
}

/// Update one of the caller's todos
///
/// PUT /todos/:id
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<TodoRequest>,
) -> Result<StatusCode, ApiError> {
    validate_todo_request(&request)?;

    let todo = db::todos::find_by_id(&state.db, &id).await?;
    let mut todo = match todo {
        Some(t) if t.owner_id == user.id => t,
        _ => return Err(ApiError::not_found("Todo not found")),
    };

    let previously_complete = todo.is_complete();
    todo.title = request.title;
    todo.description = request.description;
    todo.priority = request.priority;
    todo.complete = request.complete as i64;

    if request.complete && !previously_complete {
        todo.completed_at = Some(chrono::Utc::now().to_rfc3339());
    } else if !request.complete {
        todo.completed_at = None;
    }

    db::todos::update(&state.db, &todo).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete one of the caller's todos
///
/// DELETE /todos/:id
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let todo = db::todos::find_by_id(&state.db, &id).await?;

    match todo {
        Some(t) if t.owner_id == user.id => {
            db::todos::delete(&state.db, &t.id).await?;
            Ok(StatusCode::NO_CONTENT)
        }
        _ => Err(ApiError::not_found("Todo not found")),
    }
}
