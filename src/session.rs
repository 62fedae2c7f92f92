//! Stateless session codec.
//!
//! Sessions are HS256-signed JWTs carried in an HTTP-only cookie. There
//! is no server-side session table; validity is purely a function of
//! signature and expiry. Every verification failure collapses into the
//! same opaque error so callers learn nothing about which check failed.

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Fixed session validity: 1 day.
pub const SESSION_TTL_SECS: i64 = 86_400;

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: String,
    /// Username, echoed on /me without a database round trip
    pub username: String,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiry (unix timestamp)
    pub exp: i64,
}

/// The identity a verified token proves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    pub username: String,
}

/// Opaque verification failure. Carries no detail by design.
#[derive(Debug, thiserror::Error)]
#[error("invalid session token")]
pub struct SessionInvalid;

/// Encodes and verifies session tokens with a shared signing secret.
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        // Expiry is exact; the default 60s leeway would keep dead tokens alive.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a signed token valid for [`SESSION_TTL_SECS`].
    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, SessionInvalid> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + SESSION_TTL_SECS,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| SessionInvalid)
    }

    /// Verify signature and expiry, returning the embedded identity.
    pub fn verify(&self, token: &str) -> Result<SessionUser, SessionInvalid> {
        let data =
            decode::<Claims>(token, &self.decoding, &self.validation).map_err(|_| SessionInvalid)?;
        Ok(SessionUser {
            user_id: data.claims.sub,
            username: data.claims.username,
        })
    }
}

/// Build the login cookie: HTTP-only, SameSite=Lax, whole-origin path,
/// 1-day max age, Secure in production.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::seconds(SESSION_TTL_SECS))
        .build()
}

/// Build the logout cookie: same attributes, empty value, epoch expiry.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build()
}
