//! rb-server: HTTP control surface and process entry point for the buffer.
//!
//! - Axum API: `/health`, `/status`, `/save`, `/frames`, `/tools`,
//!   `/openapi.json`
//! - [`start`]: build the buffer from config, start it, serve until a
//!   shutdown signal, then stop the buffer

pub mod context;
pub mod error;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use rb_core::config::Config;
use rb_engine::{BufferDeps, RingBuffer};

use crate::context::AppContext;

/// Start the ring buffer and its HTTP API.
///
/// Returns once a shutdown signal has been received and the buffer has
/// stopped.
pub async fn start(config: Config) -> rb_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }
    config.check()?;

    let tools = Arc::new(rb_av::ToolRegistry::discover(&config.tools));
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::debug!("Tool not found: {}", info.name);
        }
    }

    let deps = BufferDeps::production(&config, &tools)?;
    let buffer = Arc::new(RingBuffer::new(config.clone(), deps));
    buffer.start().await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| rb_core::Error::Config(format!("Invalid server address: {e}")))?;

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            buffer.stop().await?;
            return Err(rb_core::Error::Internal(format!("Failed to bind to {addr}: {e}")));
        }
    };
    tracing::info!("HTTP API listening on {addr}");

    let ctx = AppContext::new(buffer.clone(), tools);
    let cancel = CancellationToken::new();
    let served = serve(listener, ctx, cancel).await;

    tracing::info!("Shutting down");
    buffer.stop().await?;
    tracing::info!("Server shutdown complete");
    served
}

/// Serve the API on `listener` until a signal arrives or `cancel` fires.
pub async fn serve(
    listener: tokio::net::TcpListener,
    ctx: AppContext,
    cancel: CancellationToken,
) -> rb_core::Result<()> {
    let app = router::build_router(ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(|e| rb_core::Error::Internal(format!("HTTP server error: {e}")))
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
