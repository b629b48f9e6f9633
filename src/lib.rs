//! Indie game festival listings: a filterable, sortable grid of festivals,
//! showcases and awards backed by a remote events API.
//!
//! The interesting parts live in [`filters`] (URL-shareable filter state),
//! [`engine`] (local filtering and ordering), [`coordinator`] (deciding
//! when to ask upstream again and discarding stale answers) and
//! [`session`] (the page container tying those together with a debounced
//! search box). [`routes`] serves everything as server-rendered HTML.

pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod editor;
pub mod engine;
pub mod error;
pub mod filters;
pub mod format;
pub mod models;
pub mod render;
pub mod routes;
pub mod session;
pub mod store;
mod utils;

#[cfg(test)]
mod testing;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use config::AppConfig;
use routes::AppState;

pub async fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    info!("Loading configuration...");
    let config = AppConfig::load();
    if config.revalidate_secret.is_none() {
        warn!("REVALIDATE_SECRET is not set; the revalidation endpoint is open");
    }

    let address = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(config)?;
    info!(api = %state.config.api_base_url, "Using festival API");

    let app = routes::router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                warn!("failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
