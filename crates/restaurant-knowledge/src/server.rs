//! HTTP server wiring.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::error::Result;
use crate::service::RecordService;
use crate::storage::open_store;
use crate::thumbnail::ThumbnailResolver;
use crate::web;

/// Build the shared handler state from configuration.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be created.
pub fn build_state(config: &Config) -> Result<AppState> {
    let store = open_store(&config.storage_mode())?;
    Ok(AppState {
        records: RecordService::new(store),
        thumbnails: ThumbnailResolver::new(
            &config.thumbnail.user_agent,
            config.thumbnail_timeout(),
        )?,
    })
}

/// The full application: pages, API and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(web::routes())
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the state cannot be built, the address cannot be
/// bound, or the server fails.
pub async fn serve(config: &Config, addr: SocketAddr) -> Result<()> {
    let state = build_state(config)?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        "Listening on http://{} ({})",
        listener.local_addr()?,
        state.records.describe()
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
