//! Client for the external embedding/search microservice.
//!
//! Retrieval is optional enrichment: an unset URL or key, a non-success
//! status or a transport failure all come back as an explicit
//! [`RetrievalError`] that callers log and move past. Nothing in here
//! may fail a primary request.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Snippet;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a retrieval call produced no snippets.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding service not configured")]
    NotConfigured,
    #[error("embedding service returned status {0}")]
    Status(u16),
    #[error("embedding service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RetrievalError {
    /// True when the service is simply absent rather than failing.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    base_url: String,
    api_key: String,
}

/// HTTP client for the embedding service. Cheap to clone; handlers hand
/// clones to fire-and-forget tasks.
#[derive(Debug, Clone)]
pub struct RetrievalClient {
    client: reqwest::Client,
    endpoint: Option<Endpoint>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    user_id: &'a str,
    query: &'a str,
    k: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexBody<'a> {
    user_id: &'a str,
    todo_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveBody<'a> {
    user_id: &'a str,
    todo_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveUserBody<'a> {
    user_id: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Snippet>,
}

impl RetrievalClient {
    /// `base_url`/`api_key` both present enables the client; anything
    /// else produces a permanently-unconfigured one.
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        let endpoint = match (base_url, api_key) {
            (Some(url), Some(key)) => Some(Endpoint {
                base_url: url.trim_end_matches('/').to_string(),
                api_key: key,
            }),
            _ => None,
        };
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    fn endpoint(&self) -> Result<&Endpoint, RetrievalError> {
        self.endpoint.as_ref().ok_or(RetrievalError::NotConfigured)
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, RetrievalError> {
        let endpoint = self.endpoint()?;
        let resp = self
            .client
            .post(format!("{}{}", endpoint.base_url, path))
            .header("x-api-key", &endpoint.api_key)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RetrievalError::Status(resp.status().as_u16()));
        }
        Ok(resp)
    }

    /// Fetch up to `k` semantically relevant snippets for one user.
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<Snippet>, RetrievalError> {
        let resp = self
            .post("/search", &SearchBody { user_id, query, k })
            .await?;
        let body: SearchResponse = resp.json().await?;
        Ok(body.results)
    }

    /// Index (or re-index) one todo's text.
    pub async fn index(
        &self,
        user_id: &str,
        todo_id: &str,
        text: &str,
    ) -> Result<(), RetrievalError> {
        self.post(
            "/embed",
            &IndexBody {
                user_id,
                todo_id,
                text,
            },
        )
        .await?;
        Ok(())
    }

    /// Drop the index entry for one todo.
    pub async fn remove(&self, user_id: &str, todo_id: &str) -> Result<(), RetrievalError> {
        self.post("/delete", &RemoveBody { user_id, todo_id }).await?;
        Ok(())
    }

    /// Drop every index entry for a user (account deletion).
    pub async fn remove_user(&self, user_id: &str) -> Result<(), RetrievalError> {
        self.post("/delete-user", &RemoveUserBody { user_id })
            .await?;
        Ok(())
    }
}

/// Log a best-effort side-effect failure without surfacing it.
/// Missing configuration is expected in development and logged quieter.
pub fn log_side_effect_failure(what: &str, todo_id: &str, err: &RetrievalError) {
    if err.is_not_configured() {
        tracing::debug!(todo_id, "{what} skipped: embedding service not configured");
    } else {
        tracing::warn!(todo_id, "{what} failed: {err}");
    }
}
