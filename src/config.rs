//! Configuration management for taskhive
//!
//! All configurable parameters in one place with environment variable
//! overrides. Sensible defaults for development, explicit checks for
//! production (JWT secret, CORS).

use std::env;
use tracing::info;

/// Fallback signing secret for development only. `validate()` refuses to
/// start a production server with this value.
pub const DEV_JWT_SECRET: &str = "taskhive-dev-secret-change-in-production";

/// Default OpenRouter model fallback chain, highest priority first.
pub const DEFAULT_CHAT_MODELS: [&str; 3] = [
    "alibaba/tongyi-deepresearch-30b-a3b:free",
    "meituan/longcat-flash-chat:free",
    "z-ai/glm-4.5-air:free",
];

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty = allow all)
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Whether to allow credentials (required for cookie auth across origins)
    pub allow_credentials: bool,
    /// Max age for preflight cache (seconds)
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "DELETE".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec!["Content-Type".to_string()],
            allow_credentials: false,
            max_age_seconds: 86400,
        }
    }
}

impl CorsConfig {
    /// Load from environment variables.
    ///
    /// Credentials can only be enabled together with an explicit origin
    /// list; a wildcard origin with credentials is rejected by browsers
    /// and panics in tower-http.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(origins) = env::var("TASKHIVE_CORS_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(methods) = env::var("TASKHIVE_CORS_METHODS") {
            config.allowed_methods = methods
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(headers) = env::var("TASKHIVE_CORS_HEADERS") {
            config.allowed_headers = headers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(val) = env::var("TASKHIVE_CORS_CREDENTIALS") {
            config.allow_credentials = val.to_lowercase() == "true" || val == "1";
        }

        if config.allow_credentials && config.allowed_origins.is_empty() {
            tracing::warn!(
                "CORS credentials requested without explicit origins; disabling credentials"
            );
            config.allow_credentials = false;
        }

        config
    }

    /// Convert to tower-http CorsLayer
    pub fn to_layer(&self) -> tower_http::cors::CorsLayer {
        use tower_http::cors::{AllowOrigin, Any, CorsLayer};

        let mut layer = CorsLayer::new();

        if self.allowed_origins.is_empty() {
            layer = layer.allow_origin(Any);
        } else {
            let mut valid_origins = Vec::new();
            for origin_str in &self.allowed_origins {
                match origin_str.parse::<axum::http::HeaderValue>() {
                    Ok(origin) => valid_origins.push(origin),
                    Err(_) => tracing::warn!("CORS: invalid origin '{}' - skipping", origin_str),
                }
            }
            // An empty list denies all cross-origin requests rather than
            // falling back to permissive.
            layer = layer.allow_origin(AllowOrigin::list(valid_origins));
        }

        let methods: Vec<axum::http::Method> = self
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        if methods.is_empty() {
            layer = layer.allow_methods(Any);
        } else {
            layer = layer.allow_methods(methods);
        }

        let headers: Vec<axum::http::HeaderName> = self
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        if headers.is_empty() {
            layer = layer.allow_headers(Any);
        } else {
            layer = layer.allow_headers(headers);
        }

        if self.allow_credentials {
            layer = layer.allow_credentials(true);
        }

        layer.max_age(std::time::Duration::from_secs(self.max_age_seconds))
    }
}

/// Server configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: 127.0.0.1)
    pub host: String,

    /// Server port (default: 8080)
    pub port: u16,

    /// SQLite connection string (default: sqlite://taskhive.db)
    pub database_url: String,

    /// Database pool size (default: 5)
    pub db_max_connections: u32,

    /// JWT signing secret; dev fallback unless JWT_SECRET is set
    pub jwt_secret: String,

    /// Whether running in production mode (TASKHIVE_ENV=production)
    pub is_production: bool,

    /// CORS configuration
    pub cors: CorsConfig,

    /// Rate limit: requests per second on protected routes (default: 50)
    pub rate_limit_per_second: u64,

    /// Rate limit: burst size (default: 100)
    pub rate_limit_burst: u32,

    /// Maximum concurrent requests (default: 100)
    pub max_concurrent_requests: usize,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,

    /// Maximum todos a user may hold before adds are rejected (default: 10)
    pub max_todos_per_user: i64,

    /// Todo retention window in hours; older rows are purged (default: 24)
    pub todo_retention_hours: i64,

    /// Interval between retention sweeps in seconds (default: 3600)
    pub purge_interval_secs: u64,

    /// Embedding service base URL (unset = retrieval disabled)
    pub embed_service_url: Option<String>,

    /// Embedding service API key
    pub embed_api_key: Option<String>,

    /// Snippets fetched per chat request (default: 5)
    pub rag_top_k: usize,

    /// OpenRouter API key (unset = chat requests fail upstream)
    pub openrouter_api_key: Option<String>,

    /// OpenRouter base URL (default: https://openrouter.ai/api/v1)
    pub openrouter_base_url: String,

    /// Ordered model fallback chain
    pub chat_models: Vec<String>,

    /// Retries per model after the first attempt (default: 2)
    pub chat_max_retries: u32,

    /// Base backoff delay in milliseconds (default: 500)
    pub chat_base_delay_ms: u64,

    /// Soft cap on total chat retry wall-clock time in seconds (default: 8)
    pub chat_retry_budget_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite://taskhive.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            is_production: false,
            cors: CorsConfig::default(),
            rate_limit_per_second: 50,
            rate_limit_burst: 100,
            max_concurrent_requests: 100,
            request_timeout_secs: 30,
            max_todos_per_user: 10,
            todo_retention_hours: 24,
            purge_interval_secs: 3600,
            embed_service_url: None,
            embed_api_key: None,
            rag_top_k: 5,
            openrouter_api_key: None,
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            chat_models: DEFAULT_CHAT_MODELS.iter().map(|s| s.to_string()).collect(),
            chat_max_retries: 2,
            chat_base_delay_ms: 500,
            chat_retry_budget_secs: 8,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    #[allow(clippy::field_reassign_with_default)] // Environment overrides require mutable config
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.is_production = env::var("TASKHIVE_ENV")
            .map(|v| {
                let v = v.to_lowercase();
                v == "production" || v == "prod"
            })
            .unwrap_or(false);

        if let Ok(val) = env::var("TASKHIVE_HOST") {
            config.host = val;
        }

        if let Ok(val) = env::var("TASKHIVE_PORT") {
            if let Ok(port) = val.parse() {
                config.port = port;
            }
        }

        if let Ok(val) = env::var("DATABASE_URL") {
            config.database_url = val;
        }

        if let Ok(val) = env::var("TASKHIVE_DB_POOL_SIZE") {
            if let Ok(n) = val.parse() {
                config.db_max_connections = n;
            }
        }

        match env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => config.jwt_secret = s,
            _ => {
                tracing::warn!(
                    "JWT_SECRET not set - using development secret (not for production!)"
                );
            }
        }

        if let Ok(val) = env::var("TASKHIVE_RATE_LIMIT") {
            if let Ok(n) = val.parse() {
                config.rate_limit_per_second = n;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_RATE_BURST") {
            if let Ok(n) = val.parse() {
                config.rate_limit_burst = n;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_MAX_CONCURRENT") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_requests = n;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_REQUEST_TIMEOUT") {
            if let Ok(n) = val.parse() {
                config.request_timeout_secs = n;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_MAX_TODOS") {
            if let Ok(n) = val.parse() {
                config.max_todos_per_user = n;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_TODO_TTL_HOURS") {
            if let Ok(n) = val.parse() {
                config.todo_retention_hours = n;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_PURGE_INTERVAL") {
            if let Ok(n) = val.parse() {
                config.purge_interval_secs = n;
            }
        }

        if let Ok(val) = env::var("EMBED_SERVICE_URL") {
            if !val.trim().is_empty() {
                config.embed_service_url = Some(val.trim_end_matches('/').to_string());
            }
        }

        if let Ok(val) = env::var("EMBED_API_KEY") {
            if !val.trim().is_empty() {
                config.embed_api_key = Some(val);
            }
        }

        if let Ok(val) = env::var("RAG_TOP_K") {
            if let Ok(n) = val.parse() {
                config.rag_top_k = n;
            }
        }

        if let Ok(val) = env::var("OPENROUTER_API_KEY") {
            if !val.trim().is_empty() {
                config.openrouter_api_key = Some(val);
            }
        }

        if let Ok(val) = env::var("OPENROUTER_BASE_URL") {
            config.openrouter_base_url = val.trim_end_matches('/').to_string();
        }

        if let Ok(val) = env::var("TASKHIVE_CHAT_MODELS") {
            let models: Vec<String> = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !models.is_empty() {
                config.chat_models = models;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_CHAT_RETRIES") {
            if let Ok(n) = val.parse() {
                config.chat_max_retries = n;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_CHAT_BASE_DELAY_MS") {
            if let Ok(n) = val.parse() {
                config.chat_base_delay_ms = n;
            }
        }

        if let Ok(val) = env::var("TASKHIVE_CHAT_RETRY_BUDGET_SECS") {
            if let Ok(n) = val.parse() {
                config.chat_retry_budget_secs = n;
            }
        }

        config.cors = CorsConfig::from_env();

        config
    }

    /// Refuse configurations that must never reach production.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.is_production && self.jwt_secret == DEV_JWT_SECRET {
            anyhow::bail!("JWT_SECRET must be set in production mode");
        }
        if self.chat_models.is_empty() {
            anyhow::bail!("chat model chain cannot be empty");
        }
        Ok(())
    }

    /// Whether the embedding service is fully configured
    pub fn retrieval_configured(&self) -> bool {
        self.embed_service_url.is_some() && self.embed_api_key.is_some()
    }

    /// Log a startup summary (never includes secrets)
    pub fn log(&self) {
        info!(
            host = %self.host,
            port = self.port,
            production = self.is_production,
            "server configuration loaded"
        );
        info!(
            max_todos = self.max_todos_per_user,
            retention_hours = self.todo_retention_hours,
            purge_interval_secs = self.purge_interval_secs,
            "todo quota and retention"
        );
        info!(
            retrieval_configured = self.retrieval_configured(),
            top_k = self.rag_top_k,
            models = ?self.chat_models,
            retries = self.chat_max_retries,
            base_delay_ms = self.chat_base_delay_ms,
            "ai augmentation"
        );
    }
}
