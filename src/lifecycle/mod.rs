//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build runtime → Build connector → Start accepting
//!
//! Shutdown (server.rs, shutdown.rs):
//!     Signal received → Server::stop → connectors stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Drain has a deadline from the connector's scheduler settings

pub mod server;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use server::Server;
pub use shutdown::Shutdown;
