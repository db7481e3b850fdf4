//! Demo server for the `pathmux` router.
//!
//! Serves a handful of routes behind the request-id middleware:
//!
//! ```text
//! GET  /hello/:name       → "Hello, <name>"
//! GET  /files/:name.:ext  → the name and extension
//! *    /api/*             → nested mux (GET /api/status)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use pathmux::config::{load_config, ServerConfig};
use pathmux::observability::logging;
use pathmux::{handler_fn, request_id, sub_router, Context, HttpServer, Mux, Request, ResponseWriter, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "pathmux", version, about = "Demo server for the pathmux router")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

fn app() -> Result<Mux, pathmux::Error> {
    let api = Mux::new();
    api.use_layer(sub_router());
    api.get(
        "/status",
        handler_fn(|_: &Context, w: &mut ResponseWriter, _: &Request| {
            w.write_body("ok");
        }),
    )?;

    let mux = Mux::new();
    mux.use_layer(request_id());
    mux.get(
        "/hello/:name",
        handler_fn(|cx: &Context, w: &mut ResponseWriter, _: &Request| {
            w.write_body(format!("Hello, {}", cx.param("name").unwrap_or_default()));
        }),
    )?;
    mux.get(
        "/files/:name.:ext",
        handler_fn(|cx: &Context, w: &mut ResponseWriter, _: &Request| {
            let name = cx.param("name").unwrap_or_default();
            let ext = cx.param("ext").unwrap_or_default();
            w.write_body(format!("{name} ({ext})"));
        }),
    )?;
    mux.handle("/api/*", api)?;
    Ok(mux)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pathmux starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.limits.max_body_bytes,
        drain_timeout_secs = config.shutdown.drain_timeout_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let signals = shutdown.trigger_on_signal();
    let server = HttpServer::new(app()?, config);
    server.run(listener, shutdown.subscribe()).await?;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
