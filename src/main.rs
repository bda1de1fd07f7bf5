//! HTTP server with per-connection socket buffer tuning.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ listener ──▶ acceptor hook ──▶ [TLS] ──▶ HTTP ──▶ router
//!                (socket2)    (SO_RCVBUF /       (rustls)  (hyper)  (axum)
//!                              SO_SNDBUF)
//! ```

use std::path::PathBuf;

use clap::Parser;

use configured_connector::config::{load_config, ServerConfig};
use configured_connector::http::router;
use configured_connector::lifecycle::startup;
use configured_connector::observability::logging;

#[derive(Parser)]
#[command(name = "configured-connector")]
#[command(
    about = "HTTP server that tunes socket buffers on every accepted connection",
    long_about = None
)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the connector bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Always emit socket buffer diagnostic records.
    #[arg(long)]
    diagnostics: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.connector.bind_address = bind;
    }
    if cli.diagnostics {
        config.socket.diagnostics = Some(true);
    }

    logging::init(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.connector.bind_address,
        acceptors = config.connector.acceptors,
        selectors = config.connector.selectors,
        tls = config.connector.tls.is_some(),
        "Configuration loaded"
    );

    startup::run(config, router()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
