//! Persistent and wire-level data types.
//!
//! JSON field names follow the original client contract (`userId`,
//! `isCompleted`, `createdAt`); columns are snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account. Never serialized wholesale; the password hash
/// stays server-side.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A single todo row, owned by exactly one user.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub user_id: String,
    pub todo: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(user_id: &str, text: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            todo: text.to_string(),
            is_completed: false,
            created_at: Utc::now(),
        }
    }
}

/// Whitelisted mutable todo fields. The update statement is built from
/// this fixed set only; no client-supplied column names ever reach SQL.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub todo: Option<String>,
    pub is_completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.todo.is_none() && self.is_completed.is_none()
    }
}

/// A retrieved snippet from the embedding service. Transient; only used
/// to build one chat prompt and echoed back in the chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    /// Snippet text. Older index entries use the `plot` key.
    #[serde(alias = "plot", default)]
    pub text: String,
    /// Relevance score, higher is closer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}
