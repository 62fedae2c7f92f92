//! The assistant endpoint: retrieval-augmented chat over the user's
//! todos.
//!
//! Retrieval is best-effort; a dead or unconfigured embedding service
//! degrades the answer, never the endpoint. Only orchestrator
//! exhaustion surfaces as an error.

use axum::{extract::State, response::Json, Extension};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::auth::CurrentUser;
use crate::chat::{prompt, ChatMessage};
use crate::errors::{AppError, Result, ValidationErrorExt};
use crate::models::Snippet;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct AiChatRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AiChatResponse {
    pub reply: String,
    /// Snippets that actually informed the reply, post-truncation view
    /// of the originals.
    pub retrieved: Vec<Snippet>,
}

/// POST /aiChat - answer a question grounded in the user's todos
pub async fn ai_chat(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<AiChatRequest>,
) -> Result<Json<AiChatResponse>> {
    validation::validate_prompt(&req.prompt).map_validation_err("prompt")?;
    let prompt_text = req.prompt.trim();

    let snippets = match state
        .retrieval
        .search(&user.user_id, prompt_text, state.config.rag_top_k)
        .await
    {
        Ok(snippets) => snippets,
        Err(e) if e.is_not_configured() => {
            tracing::debug!("retrieval skipped: embedding service not configured");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(user_id = %user.user_id, "retrieval failed, answering without context: {e}");
            Vec::new()
        }
    };

    let context = prompt::build_context_block(&snippets);
    let messages = [
        ChatMessage::system(prompt::SYSTEM_PROMPT),
        ChatMessage::user(prompt::build_user_message(context.as_deref(), prompt_text)),
    ];

    let reply = state
        .chat
        .complete(&messages)
        .await
        .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))?;

    Ok(Json(AiChatResponse {
        reply,
        retrieved: snippets,
    }))
}
