//! Chat completion: backend abstraction, prompt assembly and the
//! multi-model fallback orchestrator.

pub mod openrouter;
pub mod orchestrator;
pub mod prompt;

pub use openrouter::OpenRouterBackend;
pub use orchestrator::{ChatError, ChatOrchestrator};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// What one completion attempt produced.
///
/// Transport-level failures are `Err` on the backend call itself; these
/// variants describe responses that arrived but may still be unusable.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    /// A non-empty assistant reply.
    Reply(String),
    /// The provider answered but the reply field was missing or empty.
    Empty,
    /// The provider returned an error envelope or error status.
    ProviderError { code: Option<u16>, message: String },
}

impl ChatOutcome {
    /// Rate-limit signals retry the same model; other provider errors
    /// abandon it.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::ProviderError { code: Some(429), .. })
    }
}

/// A chat completion provider for a single model invocation.
///
/// The orchestrator owns model selection and retry policy; backends only
/// perform one call and classify its result.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> anyhow::Result<ChatOutcome>;
}
