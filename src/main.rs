//! API gateway binary.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ routing ──▶ load_balancer ──▶ forwarding ──▶ Backend
//!                       (axum)       (prefix)     (+ pool, health)  (retry, timeout)
//!     Client Response
//!     ◀────────────── streamed relay ◀──────────────────────────────────────────── Backend
//! ```

use std::path::PathBuf;

use clap::Parser;

use api_gateway::config::{load_config, ProxyConfig};
use api_gateway::lifecycle::{startup, Shutdown};
use api_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "HTTP reverse proxy and API gateway", version)]
struct Args {
    /// TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;

    tracing::info!("api-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        config_file = ?args.config,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    startup::run(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
