//! End-to-end tests for the HTTP surface.
//!
//! Each handler group (auth, todos, chat) gets tests that verify:
//! - The happy path returns the documented status and body shape.
//! - The session middleware rejects unauthenticated access.
//! - Ownership and quota rules hold across users.
//!
//! Run with: `cargo test --test handler_tests`

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tower::ServiceExt;

use taskhive::chat::{ChatBackend, ChatMessage, ChatOutcome};
use taskhive::config::ServerConfig;
use taskhive::db;
use taskhive::handlers::{build_router, AppContext};

// ═══════════════════════════════════════════════════════════════════════
// Test infrastructure
// ═══════════════════════════════════════════════════════════════════════

/// Chat backend that always replies, so /aiChat tests never hit the
/// network or sleep through backoff.
struct FixedReplyBackend;

#[async_trait]
impl ChatBackend for FixedReplyBackend {
    async fn complete(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
    ) -> anyhow::Result<ChatOutcome> {
        Ok(ChatOutcome::Reply("start with the dishes".to_string()))
    }
}

/// Chat backend where every model is permanently rate-limited.
struct RateLimitedBackend;

#[async_trait]
impl ChatBackend for RateLimitedBackend {
    async fn complete(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
    ) -> anyhow::Result<ChatOutcome> {
        Ok(ChatOutcome::ProviderError {
            code: Some(429),
            message: "rate limited".to_string(),
        })
    }
}

async fn test_pool() -> SqlitePool {
    // One connection keeps the in-memory database alive and shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("enable foreign keys");
    db::init_schema(&pool).await.expect("init schema");
    pool
}

fn test_config() -> ServerConfig {
    ServerConfig {
        jwt_secret: "handler-test-secret".to_string(),
        // No backoff sleeps in tests.
        chat_base_delay_ms: 0,
        ..ServerConfig::default()
    }
}

async fn app_with_backend(backend: Arc<dyn ChatBackend>) -> Router {
    let pool = test_pool().await;
    let state = Arc::new(AppContext::with_backend(pool, test_config(), backend));
    build_router(state)
}

async fn app() -> Router {
    app_with_backend(Arc::new(FixedReplyBackend)).await
}

// ── request helpers ──

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn delete(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::DELETE).uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sign up and log in, returning the session cookie pair (`token=...`).
async fn login_as(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/signup",
            json!({ "username": username, "password": "hunter22hunter22" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/login",
            json!({ "username": username, "password": "hunter22hunter22" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets the session cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    // Strip attributes; keep just name=value for the cookie header.
    set_cookie.split(';').next().unwrap().to_string()
}

async fn add_todo(app: &Router, cookie: &str, text: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/addTodo",
            json!({ "todo": text }),
            Some(cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ═══════════════════════════════════════════════════════════════════════
// Health
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_endpoints() {
    let app = app().await;

    for uri in ["/health", "/health/live", "/health/ready"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Accounts and sessions
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_signup_duplicate_username_conflicts() {
    let app = app().await;
    let body = json!({ "username": "alice", "password": "hunter22hunter22" });

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/signup", body.clone(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/signup", body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn test_signup_rejects_bad_input() {
    let app = app().await;

    // Username too short.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/signup",
            json!({ "username": "ab", "password": "hunter22hunter22" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Password too short.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/signup",
            json!({ "username": "alice", "password": "short" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let app = app().await;
    let _cookie = login_as(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/login",
            json!({ "username": "alice", "password": "not-the-password" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown user gets the identical answer.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/login",
            json!({ "username": "nobody", "password": "hunter22hunter22" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "invalid credentials");
}

#[tokio::test]
async fn test_me_reflects_session() {
    let app = app().await;
    let cookie = login_as(&app, "alice").await;

    let response = app.clone().oneshot(get("/me", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert!(body["userId"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = app().await;

    let cases = [
        get("/me", None),
        get("/getTodos", None),
        json_request(Method::POST, "/addTodo", json!({ "todo": "x" }), None),
        json_request(Method::PUT, "/updateTodo", json!({ "id": "t1" }), None),
        delete("/deleteTodo/t1", None),
        json_request(Method::POST, "/aiChat", json!({ "prompt": "hi" }), None),
    ];

    for request in cases {
        let uri = request.uri().clone();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    // Garbage cookie is just as dead as no cookie.
    let response = app
        .clone()
        .oneshot(get("/me", Some("token=not.a.jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookie_without_session() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/logout", json!({}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("token=;"));
}

#[tokio::test]
async fn test_change_password_requires_current() {
    let app = app().await;
    let cookie = login_as(&app, "alice").await;

    // Wrong current password: rejected, old credentials keep working.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/change-password",
            json!({ "currentPassword": "wrong-password", "newPassword": "a-new-password" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/login",
            json!({ "username": "alice", "password": "hunter22hunter22" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Correct current password: new credentials take over.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/change-password",
            json!({ "currentPassword": "hunter22hunter22", "newPassword": "a-new-password" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/login",
            json!({ "username": "alice", "password": "a-new-password" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_account_removes_todos() {
    let app = app().await;
    let cookie = login_as(&app, "alice").await;
    add_todo(&app, &cookie, "soon to vanish").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/delete-account",
            json!({}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The account is gone; the same username can sign up again with an
    // empty slate.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/login",
            json!({ "username": "alice", "password": "hunter22hunter22" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = login_as(&app, "alice").await;
    let response = app
        .clone()
        .oneshot(get("/getTodos", Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["todos"].as_array().unwrap().len(), 0);
}

// ═══════════════════════════════════════════════════════════════════════
// Todos
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_todo_crud_round_trip() {
    let app = app().await;
    let cookie = login_as(&app, "alice").await;

    let created = add_todo(&app, &cookie, "buy milk").await;
    let id = created["todo"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["todo"]["todo"], "buy milk");
    assert_eq!(created["todo"]["isCompleted"], false);

    // Update completion only; text survives.
    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/updateTodo",
            json!({ "id": id, "isCompleted": true }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["todo"]["isCompleted"], true);
    assert_eq!(body["todo"]["todo"], "buy milk");

    let response = app
        .clone()
        .oneshot(delete(&format!("/deleteTodo/{id}"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/getTodos", Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["todos"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_add_todo_rejects_blank_text() {
    let app = app().await;
    let cookie = login_as(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/addTodo",
            json!({ "todo": "   " }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_todo_quota_enforced() {
    let app = app().await;
    let cookie = login_as(&app, "alice").await;

    // Default quota is 10: the tenth succeeds, the eleventh is refused.
    for i in 0..10 {
        add_todo(&app, &cookie, &format!("task {i}")).await;
    }

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/addTodo",
            json!({ "todo": "one too many" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], "QUOTA_EXCEEDED");
    assert_eq!(body["message"], "max 10 todos allowed");

    // Deleting one frees a slot.
    let response = app
        .clone()
        .oneshot(get("/getTodos", Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(response).await;
    let id = body["todos"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(delete(&format!("/deleteTodo/{id}"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    add_todo(&app, &cookie, "fits again").await;
}

#[tokio::test]
async fn test_todos_are_user_scoped() {
    let app = app().await;
    let alice = login_as(&app, "alice").await;
    let bob = login_as(&app, "bob").await;

    let created = add_todo(&app, &alice, "alice's secret").await;
    let id = created["todo"]["id"].as_str().unwrap().to_string();

    // Bob cannot see, update or delete it.
    let response = app
        .clone()
        .oneshot(get("/getTodos", Some(&bob)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["todos"].as_array().unwrap().len(), 0);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/updateTodo",
            json!({ "id": id, "isCompleted": true }),
            Some(&bob),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(delete(&format!("/deleteTodo/{id}"), Some(&bob)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Still intact for alice.
    let response = app
        .clone()
        .oneshot(get("/getTodos", Some(&alice)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["todos"][0]["todo"], "alice's secret");
}

#[tokio::test]
async fn test_update_with_empty_patch_rejected() {
    let app = app().await;
    let cookie = login_as(&app, "alice").await;
    let created = add_todo(&app, &cookie, "unchanging").await;
    let id = created["todo"]["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/updateTodo",
            json!({ "id": id }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ═══════════════════════════════════════════════════════════════════════
// Chat
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_ai_chat_answers_without_retrieval() {
    // No embedding service configured: the endpoint still answers, with
    // an empty retrieved list.
    let app = app().await;
    let cookie = login_as(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/aiChat",
            json!({ "prompt": "what should I do first?" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reply"], "start with the dishes");
    assert_eq!(body["retrieved"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_ai_chat_rejects_blank_prompt() {
    let app = app().await;
    let cookie = login_as(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/aiChat",
            json!({ "prompt": "  " }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ai_chat_exhausted_chain_is_bad_gateway() {
    let app = app_with_backend(Arc::new(RateLimitedBackend)).await;
    let cookie = login_as(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/aiChat",
            json!({ "prompt": "anything" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UPSTREAM_UNAVAILABLE");
}
