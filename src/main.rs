//! Taskhive server binary.
//!
//! Wires config, database, background retention, and the HTTP stack:
//! rate limiting and auth on protected routes, CORS, a concurrency cap
//! and a request timeout globally, graceful shutdown on SIGINT/SIGTERM.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskhive::config::ServerConfig;
use taskhive::db;
use taskhive::handlers::{build_protected_routes, build_public_routes, AppContext};

const DB_CLOSE_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; missing files are fine, parse errors are not.
    match dotenvy::dotenv() {
        Ok(_) | Err(dotenvy::Error::Io(_)) => {}
        Err(e) => anyhow::bail!("failed to load .env: {e}"),
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,taskhive=debug")),
        )
        .init();

    info!("starting taskhive server");

    let config = ServerConfig::from_env();
    config.log();
    config.validate()?;

    let pool = db::connect(&config)
        .await
        .context("database connection failed")?;
    db::init_schema(&pool).await.context("schema init failed")?;

    // Retention sweep runs for the life of the process.
    tokio::spawn(db::retention_loop(
        pool.clone(),
        config.todo_retention_hours,
        config.purge_interval_secs,
    ));

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(config.rate_limit_per_second)
        .burst_size(config.rate_limit_burst)
        .finish()
        .context("invalid rate limiter configuration")?;
    info!(
        per_second = config.rate_limit_per_second,
        burst = config.rate_limit_burst,
        "rate limiting enabled"
    );

    let cors = config.cors.to_layer();
    let max_concurrent = config.max_concurrent_requests;
    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid host/port")?;

    let state = Arc::new(AppContext::new(pool.clone(), config));

    // Rate limiting covers protected routes only; health probes must
    // stay reachable for orchestration.
    let public = build_public_routes(state.clone());
    let protected = build_protected_routes(state).layer(GovernorLayer::new(governor_conf));

    let app = axum::Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors);

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("shutdown signal received, closing database pool");
    match tokio::time::timeout(Duration::from_secs(DB_CLOSE_TIMEOUT_SECS), pool.close()).await {
        Ok(()) => info!("server shutdown complete"),
        Err(_) => tracing::error!("pool close timed out after {DB_CLOSE_TIMEOUT_SECS}s"),
    }

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
