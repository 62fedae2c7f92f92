//! OpenRouter chat-completions backend.
//!
//! Talks to `{base}/chat/completions` with bearer auth. Provider errors
//! ride inside a JSON `error` envelope even on 200s, so the body is
//! inspected before the status code.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ChatBackend, ChatMessage, ChatOutcome};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Production [`ChatBackend`] backed by OpenRouter.
pub struct OpenRouterBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    error: Option<ProviderErrorBody>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    /// Legacy text-completion shape some models still emit.
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> anyhow::Result<ChatOutcome> {
        let Some(api_key) = self.api_key.as_deref() else {
            // No key means no provider; abandon the model immediately
            // rather than burning retries on guaranteed failures.
            return Ok(ChatOutcome::ProviderError {
                code: None,
                message: "OPENROUTER_API_KEY not configured".to_string(),
            });
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "model": model, "messages": messages }))
            .send()
            .await?;

        let status = resp.status();
        let envelope: CompletionEnvelope = match resp.json().await {
            Ok(body) => body,
            Err(e) if status.as_u16() == 429 => {
                // Rate-limit responses sometimes carry no JSON body at all.
                tracing::debug!("unparseable 429 body: {e}");
                return Ok(ChatOutcome::ProviderError {
                    code: Some(429),
                    message: "rate limited".to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(err) = envelope.error {
            return Ok(ChatOutcome::ProviderError {
                code: err.code.map(|c| c as u16),
                message: err.message.unwrap_or_else(|| "provider error".to_string()),
            });
        }

        if !status.is_success() {
            return Ok(ChatOutcome::ProviderError {
                code: Some(status.as_u16()),
                message: format!("provider returned status {status}"),
            });
        }

        let reply = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.and_then(|m| m.content).or(c.text))
            .unwrap_or_default();

        if reply.is_empty() {
            Ok(ChatOutcome::Empty)
        } else {
            Ok(ChatOutcome::Reply(reply))
        }
    }
}
