//! Listening socket setup.
//!
//! # Responsibilities
//! - Bind the configured address with SO_REUSEADDR and the configured backlog
//! - Hand out one listener handle per acceptor (all share the same socket)

use std::io;
use std::net::{SocketAddr, TcpListener};

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Bind address could not be parsed.
    #[error("Invalid address `{0}`")]
    Address(String),
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    /// Failed to listen or share the socket.
    #[error("Failed to listen: {0}")]
    Listen(#[from] io::Error),
}

/// A bound, non-blocking listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to `address` with the given listen backlog.
    pub fn bind(address: &str, backlog: u32) -> Result<Self, ListenerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ListenerError::Address(address.to_string()))?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket
            .bind(&addr.into())
            .map_err(|source| ListenerError::Bind { addr, source })?;
        socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;
        socket.set_nonblocking(true)?;

        let inner: TcpListener = socket.into();
        let local_addr = inner.local_addr()?;
        tracing::info!(
            address = %local_addr,
            backlog,
            "Listener bound"
        );
        Ok(Self { inner })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// One handle per acceptor; every handle accepts from the same socket.
    pub fn handles(&self, acceptors: usize) -> io::Result<Vec<TcpListener>> {
        (0..acceptors.max(1)).map(|_| self.inner.try_clone()).collect()
    }
}
