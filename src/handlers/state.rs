//! Shared application state.
//!
//! One `AppContext` is built at startup and cloned into every handler
//! behind an `Arc`. The chat backend is injectable so tests can swap in
//! a scripted implementation.

use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::chat::{ChatBackend, ChatOrchestrator, OpenRouterBackend};
use crate::config::ServerConfig;
use crate::retrieval::RetrievalClient;
use crate::session::SessionCodec;

/// Application state type alias
pub type AppState = Arc<AppContext>;

pub struct AppContext {
    pub pool: SqlitePool,
    pub sessions: SessionCodec,
    pub retrieval: RetrievalClient,
    pub chat: ChatOrchestrator,
    pub config: ServerConfig,
}

impl AppContext {
    /// Production wiring: OpenRouter backend from config.
    pub fn new(pool: SqlitePool, config: ServerConfig) -> Self {
        let backend = Arc::new(OpenRouterBackend::new(
            config.openrouter_base_url.clone(),
            config.openrouter_api_key.clone(),
        ));
        Self::with_backend(pool, config, backend)
    }

    /// Wiring with an explicit chat backend (used by tests).
    pub fn with_backend(
        pool: SqlitePool,
        config: ServerConfig,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        let sessions = SessionCodec::new(&config.jwt_secret);
        let retrieval = RetrievalClient::new(
            config.embed_service_url.clone(),
            config.embed_api_key.clone(),
        );
        let chat = ChatOrchestrator::new(
            backend,
            config.chat_models.clone(),
            config.chat_max_retries,
            Duration::from_millis(config.chat_base_delay_ms),
            Duration::from_secs(config.chat_retry_budget_secs),
        );
        Self {
            pool,
            sessions,
            retrieval,
            chat,
            config,
        }
    }
}
