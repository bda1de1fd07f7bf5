//! Startup orchestration.
//!
//! Config is already loaded and logging initialised when [`run`] is called.
//! Metrics come up first, listeners last; any startup error is fatal.

use axum::Router;

use crate::config::ServerConfig;
use crate::connector::{ConfiguredConnector, ConnectorBuilder, ConnectorError};
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::Server;
use crate::observability::metrics::init_metrics;

/// Serve `app` with a connector built from `config` until a stop signal.
pub async fn run(config: ServerConfig, app: Router) -> Result<(), ConnectorError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = Server::new();
    let connector: ConfiguredConnector =
        ConnectorBuilder::from_config(server.clone(), &config).build()?;
    let running = connector.start(app).await?;

    tracing::info!(address = %running.local_addr(), "Listening for connections");

    shutdown_signal().await;
    server.stop();
    running.join().await
}
