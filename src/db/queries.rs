//! Parameterized queries for users and todos.
//!
//! Every todo statement is scoped by `(id, user_id)`; ownership is
//! enforced in SQL, not in handler logic. The update path uses a fixed
//! whitelist of mutable columns - there is no dynamic SQL anywhere.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use crate::models::{Todo, TodoPatch, User};

// ── users ──

pub async fn create_user(
    pool: &SqlitePool,
    id: &str,
    username: &str,
    password_hash: &str,
    created_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .bind(created_at)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn password_hash_of(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Returns the number of rows updated (0 when the user is gone).
pub async fn set_password_hash(
    pool: &SqlitePool,
    user_id: &str,
    password_hash: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Returns the number of deleted users; todos cascade via FK.
pub async fn delete_user(pool: &SqlitePool, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ── todos ──

pub async fn count_todos(pool: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM todos WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn insert_todo(pool: &SqlitePool, todo: &Todo) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO todos (id, user_id, todo, is_completed, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&todo.id)
    .bind(&todo.user_id)
    .bind(&todo.todo)
    .bind(todo.is_completed)
    .bind(todo.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Newest-first listing for one user.
pub async fn list_todos(pool: &SqlitePool, user_id: &str) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(
        "SELECT id, user_id, todo, is_completed, created_at \
         FROM todos WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Apply a patch to an owned todo, returning the updated row.
///
/// `None` means no row matched `(todo_id, user_id)` - which doubles as
/// the authorization check. Callers must reject empty patches first.
pub async fn update_todo(
    pool: &SqlitePool,
    user_id: &str,
    todo_id: &str,
    patch: &TodoPatch,
) -> Result<Option<Todo>, sqlx::Error> {
    const RETURNING: &str = "RETURNING id, user_id, todo, is_completed, created_at";

    match (patch.todo.as_deref(), patch.is_completed) {
        (Some(text), Some(done)) => {
            sqlx::query_as::<_, Todo>(&format!(
                "UPDATE todos SET todo = ?, is_completed = ? WHERE id = ? AND user_id = ? {RETURNING}"
            ))
            .bind(text)
            .bind(done)
            .bind(todo_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
        }
        (Some(text), None) => {
            sqlx::query_as::<_, Todo>(&format!(
                "UPDATE todos SET todo = ? WHERE id = ? AND user_id = ? {RETURNING}"
            ))
            .bind(text)
            .bind(todo_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
        }
        (None, Some(done)) => {
            sqlx::query_as::<_, Todo>(&format!(
                "UPDATE todos SET is_completed = ? WHERE id = ? AND user_id = ? {RETURNING}"
            ))
            .bind(done)
            .bind(todo_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
        }
        (None, None) => Ok(None),
    }
}

/// Returns the number of deleted rows (0 when missing or unowned).
pub async fn delete_todo(
    pool: &SqlitePool,
    user_id: &str,
    todo_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
        .bind(todo_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn purge_todos_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
