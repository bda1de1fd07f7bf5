//! HTTP connector that tunes kernel socket buffers on every accepted
//! connection.

pub mod config;
pub mod connector;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use connector::{ConfiguredConnector, ConnectorBuilder, RunningConnector};
pub use lifecycle::Server;
pub use net::{BufferSizeConfigurator, SocketConfigurator, RECV_BUFFER_BYTES, SEND_BUFFER_BYTES};
