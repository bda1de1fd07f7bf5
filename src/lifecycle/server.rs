//! Server lifecycle.
//!
//! A [`Server`] is the owner every connector is bound to. Stopping the server
//! stops all connectors started against it.

use tokio::sync::watch;

use crate::lifecycle::Shutdown;

#[derive(Debug, Clone, Default)]
pub struct Server {
    shutdown: Shutdown,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every connector bound to this server to stop.
    pub fn stop(&self) {
        if !self.shutdown.is_triggered() {
            tracing::info!("Server stopping");
        }
        self.shutdown.trigger();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_triggered()
    }

    pub(crate) fn stop_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}
