//! Todo models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub complete: i64,
    pub owner_id: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl Todo {
    pub fn is_complete(&self) -> bool {
        self.complete != 0
    }
}

/// Response DTO with the completion flag as a proper bool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub complete: bool,
    pub owner_id: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            priority: todo.priority,
            complete: todo.complete != 0,
            owner_id: todo.owner_id,
            created_at: todo.created_at,
            completed_at: todo.completed_at,
        }
    }
}

/// Create/update payload; used for both, like a form.
#[derive(Debug, Deserialize)]
pub struct TodoRequest {
    pub title: String,
    pub description: String,
    pub priority: i64,
    #[serde(default)]
    pub complete: bool,
}
