//! Multi-model fallback orchestration.
//!
//! External chat providers are unreliable and rate-limited. The
//! orchestrator walks a fixed, prioritized model chain; each model gets
//! a bounded number of attempts with exponential backoff, and the first
//! non-empty reply wins. Worst case is `models x (retries + 1)` calls
//! plus cumulative backoff, further capped by a soft wall-clock budget.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{ChatBackend, ChatMessage, ChatOutcome};

/// All models exhausted without a usable reply.
#[derive(Debug, thiserror::Error)]
#[error("all chat models failed or are rate-limited")]
pub struct ChatError;

/// Drives a prioritized model chain against one backend.
pub struct ChatOrchestrator {
    backend: Arc<dyn ChatBackend>,
    models: Vec<String>,
    max_retries: u32,
    base_delay: Duration,
    retry_budget: Duration,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        models: Vec<String>,
        max_retries: u32,
        base_delay: Duration,
        retry_budget: Duration,
    ) -> Self {
        Self {
            backend,
            models,
            max_retries,
            base_delay,
            retry_budget,
        }
    }

    /// Return the first usable reply, trying each model in order with up
    /// to `max_retries + 1` attempts apiece.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let started = Instant::now();

        for model in &self.models {
            debug!(model, "trying chat model");

            'attempts: for attempt in 0..=self.max_retries {
                if attempt > 0 {
                    // Soft budget: once spent, stop backing off entirely.
                    if started.elapsed() >= self.retry_budget {
                        warn!(model, "chat retry budget exhausted");
                        return Err(ChatError);
                    }
                    let delay = self.base_delay * 2u32.pow(attempt - 1);
                    tokio::time::sleep(delay).await;
                }

                let outcome = match self.backend.complete(model, messages).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(model, attempt, "chat transport error: {e:#}");
                        if attempt == self.max_retries {
                            break 'attempts; // next model, no delay
                        }
                        continue;
                    }
                };

                match outcome {
                    ChatOutcome::Reply(reply) => {
                        info!(model, attempt, "chat model produced a reply");
                        return Ok(reply);
                    }
                    ChatOutcome::Empty => {
                        warn!(model, attempt, "chat model returned an empty reply");
                        if attempt == self.max_retries {
                            break 'attempts;
                        }
                    }
                    outcome @ ChatOutcome::ProviderError { .. } => {
                        let rate_limited = outcome.is_rate_limited();
                        if let ChatOutcome::ProviderError { code, message } = outcome {
                            warn!(model, attempt, ?code, "chat provider error: {message}");
                        }
                        if rate_limited && attempt < self.max_retries {
                            continue; // same model, after backoff
                        }
                        break 'attempts; // abandon this model
                    }
                }
            }
        }

        warn!("all chat models exhausted");
        Err(ChatError)
    }
}
