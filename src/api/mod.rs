use axum::extract::Path;
use axum::routing::post;
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::{AppError, AppJson};
use crate::models::*;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{todo_id}",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
        .route("/todos/{todo_id}/attachment", post(generate_upload_url))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.todos.ping().await?;
    Ok(StatusCode::OK)
}

async fn list_todos(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TodoListResponse>, AppError> {
    info!(user_id = user.user_id(), "listing todos");
    let items = state.todos.list(user.user_id()).await?;
    Ok(Json(TodoListResponse { items }))
}

async fn get_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
) -> Result<Json<TodoResponse>, AppError> {
    info!(user_id = user.user_id(), %todo_id, "fetching todo");
    let item = state.todos.get(user.user_id(), &todo_id).await?;
    Ok(Json(TodoResponse { item }))
}

async fn create_todo(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), AppError> {
    let new_todo = req.validate()?;
    let item = new_todo.into_item(user.user_id(), Utc::now());
    info!(user_id = user.user_id(), todo_id = %item.todo_id, "creating todo");

    let item = state.todos.create(item).await?;
    Ok((StatusCode::CREATED, Json(TodoResponse { item })))
}

async fn update_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
    AppJson(req): AppJson<UpdateTodoRequest>,
) -> Result<StatusCode, AppError> {
    let patch = req.validate()?;
    info!(user_id = user.user_id(), %todo_id, "updating todo");

    state.todos.update(user.user_id(), &todo_id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
) -> Result<StatusCode, AppError> {
    info!(user_id = user.user_id(), %todo_id, "deleting todo");
    let item = state.todos.get(user.user_id(), &todo_id).await?;
    state.todos.delete(user.user_id(), &todo_id).await?;

    // The item is already gone; a leftover object is only logged.
    if item.attachment_url.is_some() {
        if let Err(e) = state.attachments.remove(&todo_id).await {
            warn!(%todo_id, "failed to remove attachment: {}", e);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_upload_url(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<String>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    info!(user_id = user.user_id(), %todo_id, "generating attachment upload url");
    state.todos.get(user.user_id(), &todo_id).await?;

    let upload_url = state.attachments.upload_url(&todo_id).await?;
    let download_url = state.attachments.download_url(&todo_id);
    state
        .todos
        .set_attachment_url(user.user_id(), &todo_id, &download_url)
        .await?;

    Ok(Json(UploadUrlResponse { upload_url }))
}
