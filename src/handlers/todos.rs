//! Todo CRUD handlers.
//!
//! Every read and write is scoped to the session user. Index updates
//! for the embedding service run as fire-and-forget tasks after the
//! database commit; they never change a response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;
use crate::auth::CurrentUser;
use crate::db::queries;
use crate::errors::{AppError, Result, ValidationErrorExt};
use crate::models::{Todo, TodoPatch};
use crate::retrieval::{log_side_effect_failure, RetrievalClient};
use crate::validation;

fn spawn_index(retrieval: RetrievalClient, user_id: String, todo_id: String, text: String) {
    tokio::spawn(async move {
        if let Err(e) = retrieval.index(&user_id, &todo_id, &text).await {
            log_side_effect_failure("todo indexing", &todo_id, &e);
        }
    });
}

fn spawn_remove(retrieval: RetrievalClient, user_id: String, todo_id: String) {
    tokio::spawn(async move {
        if let Err(e) = retrieval.remove(&user_id, &todo_id).await {
            log_side_effect_failure("index removal", &todo_id, &e);
        }
    });
}

/// GET /getTodos - newest-first listing for the session user
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let todos = queries::list_todos(&state.pool, &user.user_id).await?;
    Ok(Json(json!({ "todos": todos })))
}

#[derive(Debug, Deserialize)]
pub struct AddTodoRequest {
    pub todo: String,
}

/// POST /addTodo - create a todo, enforcing the per-user quota
pub async fn add_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<AddTodoRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    validation::validate_todo_text(&req.todo).map_validation_err("todo")?;
    let text = req.todo.trim().to_string();

    let current = queries::count_todos(&state.pool, &user.user_id).await?;
    let limit = state.config.max_todos_per_user;
    if current >= limit {
        return Err(AppError::QuotaExceeded { current, limit });
    }

    let todo = Todo::new(&user.user_id, &text);
    queries::insert_todo(&state.pool, &todo).await?;

    spawn_index(
        state.retrieval.clone(),
        user.user_id.clone(),
        todo.id.clone(),
        todo.todo.clone(),
    );

    tracing::debug!(user_id = %user.user_id, todo_id = %todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(json!({ "todo": todo }))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    pub id: String,
    pub todo: Option<String>,
    pub is_completed: Option<bool>,
}

/// PUT /updateTodo - patch text and/or completion of an owned todo
pub async fn update_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<Json<Value>> {
    let text = match req.todo {
        Some(ref t) => {
            validation::validate_todo_text(t).map_validation_err("todo")?;
            Some(t.trim().to_string())
        }
        None => None,
    };

    let patch = TodoPatch {
        todo: text,
        is_completed: req.is_completed,
    };
    if patch.is_empty() {
        return Err(AppError::InvalidInput {
            field: "body".to_string(),
            reason: "nothing to update".to_string(),
        });
    }

    let updated = queries::update_todo(&state.pool, &user.user_id, &req.id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("todo".to_string()))?;

    // Re-index only when the text actually changed.
    if patch.todo.is_some() {
        spawn_index(
            state.retrieval.clone(),
            user.user_id.clone(),
            updated.id.clone(),
            updated.todo.clone(),
        );
    }

    Ok(Json(json!({ "todo": updated })))
}

/// DELETE /deleteTodo/{id} - remove an owned todo
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let deleted = queries::delete_todo(&state.pool, &user.user_id, &id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("todo".to_string()));
    }

    spawn_remove(state.retrieval.clone(), user.user_id.clone(), id.clone());

    tracing::debug!(user_id = %user.user_id, todo_id = %id, "todo deleted");
    Ok(Json(json!({ "message": "todo deleted" })))
}
