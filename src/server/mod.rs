//! HTTP surface.

mod analyze;
mod health;
mod response;
mod species;

pub use response::ErrorBody;

use crate::constants::server::MULTIPART_OVERHEAD_BYTES;
use crate::error::{Error, Result};
use crate::gateway::AnalysisGateway;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// State shared by handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request orchestration.
    pub gateway: AnalysisGateway,
    /// Gateway start time.
    pub started: Instant,
}

impl AppState {
    /// State starting the uptime clock now.
    pub fn new(gateway: AnalysisGateway) -> Self {
        Self {
            gateway,
            started: Instant::now(),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .gateway
        .settings()
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/analyze", post(analyze::analyze))
        .route("/health", get(health::health))
        .route("/species", get(species::species))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::ServerBind {
            addr: addr.to_string(),
            source,
        })?;

    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received terminate signal, shutting down"),
    }
}
