//! Health and readiness probes.

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use super::state::AppState;

/// GET /health - service identity and version
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "taskhive",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/live - process is up
pub async fn health_live() -> Json<Value> {
    Json(json!({ "status": "alive" }))
}

/// GET /health/ready - database reachable
pub async fn health_ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
    {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::error!("readiness probe failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
