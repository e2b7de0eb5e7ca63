mod admin;
pub mod auth;
mod error;
mod todos;
mod users;

pub use error::{ApiError, ErrorCode};

use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/token", post(auth::login))
        .route("/logout", post(auth::logout));

    // Owner-scoped todos (auth enforced by extractors)
    let todo_routes = Router::new()
        .route("/", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/:id",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        );

    let admin_routes = Router::new()
        .route("/todos", get(admin::list_all_todos))
        .route("/todos/:id", delete(admin::delete_todo));

    let user_routes = Router::new()
        .route("/me", get(users::current_user))
        .route("/password", put(users::change_password));

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/todos", todo_routes)
        .nest("/admin", admin_routes)
        .nest("/user", user_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "app": state.config.server.app_name,
    }))
}
