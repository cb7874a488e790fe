//! Process wiring: builds the adapters, starts the change fan-out and serves
//! the WebSocket endpoints until a shutdown signal arrives.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::auth::SessionServiceResolver;
use crate::adapters::postgres::{PostgresChangeFeed, PostgresThreadLookup};
use crate::adapters::websocket::{websocket_router, RoomRegistry, WebSocketState};
use crate::application::{ChangeFanOut, RestartPolicy};
use crate::config::{AppConfig, ServerConfig, ValidationError};

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session service client error: {0}")]
    SessionService(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the HTTP application around the WebSocket routes.
pub fn build_router(state: WebSocketState, config: &ServerConfig) -> Router {
    websocket_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

/// Run the server until SIGINT or SIGTERM.
pub async fn run(config: AppConfig) -> Result<(), ServerError> {
    let addr = config.server.socket_addr()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let resolver = SessionServiceResolver::from_config(&config.session_service)?;
    tracing::info!(identity_url = %resolver.identity_url(), "Session service configured");

    let registry = Arc::new(RoomRegistry::with_presence());

    let restart = RestartPolicy::default()
        .with_max_restarts(config.fanout.max_feed_restarts)
        .with_backoff(config.fanout.restart_backoff());
    let fanout = Arc::new(ChangeFanOut::with_restart_policy(
        Arc::new(PostgresChangeFeed::new(pool.clone())),
        Arc::new(PostgresThreadLookup::new(pool.clone())),
        registry.clone(),
        restart,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let fanout_task = tokio::spawn(fanout.run(shutdown_rx));

    let state = WebSocketState::new(
        registry,
        Arc::new(resolver),
        config.server.outbox_capacity,
    );
    let app = build_router(state, &config.server);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop the feeds even when serving failed
    let _ = shutdown_tx.send(true);
    if let Err(e) = fanout_task.await {
        tracing::error!("Change fan-out task failed: {}", e);
    }
    pool.close().await;
    tracing::info!("Shutdown complete");

    served.map_err(ServerError::from)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
