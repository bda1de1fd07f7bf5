//! Accept-path hook.
//!
//! `ConfiguringAcceptor` sits at the front of an axum-server acceptor chain.
//! It runs a [`SocketConfigurator`] on the raw `TcpStream` and then hands the
//! stream to the next acceptor (plain or TLS).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum_server::accept::Accept;
use tokio::net::TcpStream;

use crate::net::configurator::SocketConfigurator;

/// Process-wide accepted-connection sequence.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct ConfiguringAcceptor<A> {
    inner: A,
    configurator: Arc<dyn SocketConfigurator>,
}

impl<A> ConfiguringAcceptor<A> {
    pub fn new(inner: A, configurator: Arc<dyn SocketConfigurator>) -> Self {
        Self { inner, configurator }
    }
}

impl<A, S> Accept<TcpStream, S> for ConfiguringAcceptor<A>
where
    A: Accept<TcpStream, S>,
{
    type Stream = A::Stream;
    type Service = A::Service;
    type Future = A::Future;

    fn accept(&self, stream: TcpStream, service: S) -> Self::Future {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let span = tracing::debug_span!("accept", connection_id = id);
        {
            let _enter = span.enter();
            if let Ok(peer) = stream.peer_addr() {
                tracing::trace!(peer_addr = %peer, "Configuring accepted socket");
            }
            self.configurator.configure(&stream);
        }
        metrics::counter!("connector_connections_accepted_total").increment(1);
        self.inner.accept(stream, service)
    }
}
