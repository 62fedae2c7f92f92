//! Account handlers: signup, login, logout, session introspection,
//! password change and account deletion.
//!
//! Passwords are bcrypt-hashed at a fixed cost on the blocking pool and
//! never logged. Login failures for unknown users and wrong passwords
//! are indistinguishable.

use axum::{extract::State, http::StatusCode, response::Json, Extension};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::state::AppState;
use crate::auth::CurrentUser;
use crate::db::queries;
use crate::errors::{AppError, Result, ValidationErrorExt};
use crate::session::{clear_session_cookie, session_cookie};
use crate::validation;

/// Fixed bcrypt work factor. Documented here so nobody "tunes" it per
/// call site; raising it invalidates nothing, old hashes keep verifying.
pub const BCRYPT_COST: u32 = 12;

async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// POST /signup - create an account
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let username = req.username.trim().to_string();
    validation::validate_username(&username).map_validation_err("username")?;
    validation::validate_password(&req.password).map_validation_err("password")?;

    let password_hash = hash_password(req.password).await?;
    let user_id = uuid::Uuid::new_v4().to_string();

    match queries::create_user(
        &state.pool,
        &user_id,
        &username,
        &password_hash,
        chrono::Utc::now(),
    )
    .await
    {
        Ok(()) => {}
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(AppError::Conflict("username".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(%username, "user created");
    Ok((StatusCode::CREATED, Json(json!({ "message": "user created" }))))
}

/// POST /login - verify credentials and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<(CookieJar, Json<Value>)> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput {
            field: "credentials".to_string(),
            reason: "username and password required".to_string(),
        });
    }

    // Unknown user and wrong password take the same path out.
    let user = queries::find_user_by_username(&state.pool, req.username.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(AppError::InvalidCredentials);
    }

    let token = state
        .sessions
        .issue(&user.id, &user.username)
        .map_err(|e| AppError::Internal(e.into()))?;

    let jar = jar.add(session_cookie(token, state.config.is_production));

    tracing::debug!(username = %user.username, "login succeeded");
    Ok((
        jar,
        Json(json!({ "message": "logged in", "username": user.username })),
    ))
}

/// POST /logout - clear the session cookie unconditionally
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.add(clear_session_cookie(state.config.is_production));
    (jar, Json(json!({ "message": "logged out" })))
}

/// Response for GET /me
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
}

/// GET /me - identity carried by the session cookie
pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        username: user.username,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /change-password - re-verify the current password, then overwrite
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    if req.current_password.is_empty() {
        return Err(AppError::InvalidInput {
            field: "currentPassword".to_string(),
            reason: "current and new password required".to_string(),
        });
    }
    validation::validate_password(&req.new_password).map_validation_err("newPassword")?;

    let current_hash = queries::password_hash_of(&state.pool, &user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    if !verify_password(req.current_password, current_hash).await? {
        return Err(AppError::InvalidCredentials);
    }

    let new_hash = hash_password(req.new_password).await?;
    let updated = queries::set_password_hash(&state.pool, &user.user_id, &new_hash).await?;
    if updated == 0 {
        return Err(AppError::NotFound("user".to_string()));
    }

    tracing::info!(user_id = %user.user_id, "password changed");
    Ok(Json(json!({ "message": "password changed" })))
}

/// POST /delete-account - remove the user; todos cascade, index entries
/// are wiped best-effort
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let deleted = queries::delete_user(&state.pool, &user.user_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("user".to_string()));
    }

    // Best-effort: drop the user's embeddings, never block the response.
    let retrieval = state.retrieval.clone();
    let user_id = user.user_id.clone();
    tokio::spawn(async move {
        if let Err(e) = retrieval.remove_user(&user_id).await {
            crate::retrieval::log_side_effect_failure("embedding user wipe", &user_id, &e);
        }
    });

    tracing::info!(user_id = %user.user_id, "account deleted");
    Ok(Json(json!({ "message": "account deleted" })))
}
