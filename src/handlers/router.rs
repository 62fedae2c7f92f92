//! Router configuration - centralized route definitions.
//!
//! Routes are split into public (no auth) and protected (session cookie
//! required). The auth middleware wraps protected routes only, so health
//! probes and the login flow stay reachable without a session.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use super::state::AppState;
use super::{chat, health, todos, users};
use crate::auth;

/// Build the public routes (no authentication required)
///
/// Logout is public on purpose: it only clears the cookie, and a user
/// holding an expired token must still be able to clear it.
pub fn build_public_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        .route("/signup", post(users::signup))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .with_state(state)
}

/// Build the protected routes with the session middleware applied.
/// Rate limiting is layered on top by main, not here, so handler tests
/// can drive these routes without connect-info.
pub fn build_protected_routes(state: AppState) -> Router {
    Router::new()
        .route("/me", get(users::me))
        .route("/getTodos", get(todos::list_todos))
        .route("/addTodo", post(todos::add_todo))
        .route("/updateTodo", put(todos::update_todo))
        .route("/deleteTodo/{id}", delete(todos::delete_todo))
        .route("/change-password", post(users::change_password))
        .route("/delete-account", post(users::delete_account))
        .route("/aiChat", post(chat::ai_chat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .with_state(state)
}

/// Build the complete router with auth applied to protected routes.
pub fn build_router(state: AppState) -> Router {
    let public = build_public_routes(state.clone());
    let protected = build_protected_routes(state);

    Router::new().merge(public).merge(protected)
}
