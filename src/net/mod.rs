//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (shared listening socket, one handle per acceptor)
//!     → acceptor.rs (post-accept hook)
//!     → configurator.rs (standard options, then SO_RCVBUF / SO_SNDBUF)
//!     → tls.rs (optional TLS handshake)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - The post-accept hook is a trait object, not a listener subclass
//! - Socket tuning failures are never fatal to a connection
//! - TLS is optional and handled transparently

pub mod acceptor;
pub mod configurator;
pub mod listener;
pub mod tls;

pub use acceptor::ConfiguringAcceptor;
pub use configurator::{
    BufferSizeConfigurator, SocketBuffers, SocketConfigurator, StandardConfigurator,
    RECV_BUFFER_BYTES, SEND_BUFFER_BYTES,
};
pub use listener::{Listener, ListenerError};
