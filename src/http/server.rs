//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the mux bridge in request tracing
//! - Bind the app to a listener
//! - Drain in-flight requests on shutdown, bounded by a deadline

use std::future::IntoFuture;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::service;
use crate::mux::Mux;

/// HTTP front end for a [`Mux`].
pub struct HttpServer {
    app: axum::Router,
    config: ServerConfig,
    cancel: CancellationToken,
}

impl HttpServer {
    pub fn new(mux: Mux, config: ServerConfig) -> Self {
        let cancel = CancellationToken::new();
        let app = service::router(mux, config.limits.max_body_bytes, cancel.clone())
            .layer(TraceLayer::new_for_http());
        Self { app, config, cancel }
    }

    /// Serve until `shutdown` fires, then stop accepting and wait up to the
    /// drain timeout for in-flight requests. Requests still running after
    /// the deadline see their context cancelled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let HttpServer { app, config, cancel } = self;
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let stop = CancellationToken::new();
        let stopped = stop.clone();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { stopped.cancelled().await })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => {
                tracing::info!("HTTP server stopped");
                return result;
            }
            _ = shutdown.recv() => {}
        }

        let drain = Duration::from_secs(config.shutdown.drain_timeout_secs);
        tracing::info!(drain_timeout = ?drain, "Shutdown signal received, draining");
        stop.cancel();

        match tokio::time::timeout(drain, &mut serve).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(drain_timeout = ?drain, "Drain deadline passed, cancelling in-flight requests");
                cancel.cancel();
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
