//! Database lifecycle: pool construction, idempotent schema setup and
//! the retention sweep that replaces the original row-TTL job.

pub mod queries;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Build the process-wide connection pool. Created once at startup and
/// injected everywhere; never recreated per request.
pub async fn connect(config: &ServerConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("invalid database url: {}", config.database_url))?
        .create_if_missing(true)
        // Cascading deletes (user -> todos) depend on this pragma.
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(options)
        .await
        .context("failed to connect to database")?;

    Ok(pool)
}

/// Create tables and indexes if they do not exist. Safe to run on every
/// startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            username      TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at    TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS todos (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            todo         TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_todos_user_created ON todos(user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    debug!("database schema ready");
    Ok(())
}

/// Delete todos older than the retention window, regardless of
/// completion state. Returns the number of purged rows.
pub async fn purge_expired_todos(pool: &SqlitePool, retention_hours: i64) -> Result<u64> {
    let cutoff = Utc::now() - Duration::hours(retention_hours);
    let purged = queries::purge_todos_before(pool, cutoff).await?;
    if purged > 0 {
        info!(purged, retention_hours, "purged expired todos");
    }
    Ok(purged)
}

/// Periodic retention sweep. Runs until the process shuts down; sweep
/// failures are logged and the loop continues.
pub async fn retention_loop(pool: SqlitePool, retention_hours: i64, interval_secs: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
    // The first tick fires immediately; skip it so startup stays quick.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = purge_expired_todos(&pool, retention_hours).await {
            warn!("retention sweep failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Todo;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, id: &str, username: &str) {
        queries::create_user(pool, id, username, "hash", Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = test_pool().await;
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_respects_retention_window() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", "alice").await;

        let mut old = Todo::new("u1", "stale");
        old.created_at = Utc::now() - Duration::hours(30);
        queries::insert_todo(&pool, &old).await.unwrap();

        let fresh = Todo::new("u1", "fresh");
        queries::insert_todo(&pool, &fresh).await.unwrap();

        let purged = purge_expired_todos(&pool, 24).await.unwrap();
        assert_eq!(purged, 1);

        let remaining = queries::list_todos(&pool, "u1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].todo, "fresh");
    }

    #[tokio::test]
    async fn test_user_delete_cascades_to_todos() {
        let pool = test_pool().await;
        seed_user(&pool, "u1", "alice").await;
        queries::insert_todo(&pool, &Todo::new("u1", "task"))
            .await
            .unwrap();

        let deleted = queries::delete_user(&pool, "u1").await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = queries::list_todos(&pool, "u1").await.unwrap();
        assert!(remaining.is_empty());
    }
}
