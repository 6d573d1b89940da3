//! Startup sequence: connect to the database, then listen.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::db;
use crate::state::AppState;
use crate::web;

/// How startup ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Served until the shutdown signal
    Stopped,
    /// The database could not be reached; nothing was bound
    DatabaseUnavailable,
}

/// Run the server until Ctrl+C
pub async fn run(config: AppConfig) -> anyhow::Result<StartupOutcome> {
    run_until(config, shutdown_signal()).await
}

/// Run the server until `shutdown` resolves.
///
/// A failed database connection is logged and ends startup without binding
/// the listener. There is no retry.
pub async fn run_until<F>(config: AppConfig, shutdown: F) -> anyhow::Result<StartupOutcome>
where
    F: Future<Output = ()> + Send + 'static,
{
    let pool = match db::connect(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            return Ok(StartupOutcome::DatabaseUnavailable);
        }
    };
    tracing::info!("Database connected");

    let bind_addr = config.web.bind_addr();
    let public_dir = config.assets.public_dir_path();
    let state = AppState::new(config, pool)?;

    state.images.ensure_dir().await?;
    if !public_dir.is_dir() {
        tracing::warn!("Public directory {} does not exist", public_dir.display());
    }

    spawn_session_cleanup(state.clone());

    let app = web::create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Starting HTTP server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(StartupOutcome::Stopped)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Periodically purge expired sessions
fn spawn_session_cleanup(state: Arc<AppState>) {
    let period = Duration::from_secs(state.config.session.cleanup_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match state.sessions.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!("Removed {} expired sessions", removed),
                Err(e) => tracing::warn!("Session cleanup failed: {}", e),
            }
        }
    });
}
