//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (configured by the connector's socket hook)
//!     → hyper HTTP/1.1 or HTTP/2 driver (axum-server)
//!     → server.rs middleware (trace, request timeout)
//!     → application router
//! ```

pub mod server;

pub use server::{router, with_middleware};
