//! Cookie-session authentication middleware.
//!
//! Applied to protected routes only. A missing cookie, a missing token
//! and a failed verification all surface as the same 401.

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;

use crate::errors::AppError;
use crate::handlers::state::AppState;
use crate::session::SESSION_COOKIE;

/// The authenticated identity, inserted into request extensions for
/// downstream handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub username: String,
}

/// Reject the request unless it carries a valid session cookie.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated)?;

    let user = state
        .sessions
        .verify(&token)
        .map_err(|_| AppError::Unauthenticated)?;

    req.extensions_mut().insert(CurrentUser {
        user_id: user.user_id,
        username: user.username,
    });

    Ok(next.run(req).await)
}
