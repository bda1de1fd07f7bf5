//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Sentinel for acceptor/selector counts meaning "size automatically".
pub const AUTO: i32 = -1;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Connector configuration (bind address, threads, factory chain).
    pub connector: ConnectorConfig,

    /// Per-connection socket settings.
    pub socket: SocketConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Connector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Number of accept loops, or -1 for automatic sizing.
    pub acceptors: i32,

    /// Number of I/O worker threads, or -1 for automatic sizing.
    pub selectors: i32,

    /// Listen backlog.
    pub backlog: u32,

    /// Optional TLS termination in front of the factory chain.
    pub tls: Option<TlsConfig>,

    /// Explicit connection factories, in order. Empty means default HTTP.
    pub factories: Vec<ConnectionFactory>,

    pub scheduler: Scheduler,

    pub buffer_pool: BufferPool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            acceptors: AUTO,
            selectors: AUTO,
            backlog: 1024,
            tls: None,
            factories: Vec::new(),
            scheduler: Scheduler::default(),
            buffer_pool: BufferPool::default(),
        }
    }
}

/// TLS configuration for the connector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// A protocol handler in the connector's factory chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionFactory {
    /// TLS termination; hands decrypted bytes to the next factory.
    Tls(TlsConfig),
    /// HTTP/1.1 and HTTP/2 request handling.
    Http(HttpConnectionFactory),
}

impl ConnectionFactory {
    /// Protocol name used in logs.
    pub fn protocol(&self) -> &'static str {
        match self {
            ConnectionFactory::Tls(_) => "tls",
            ConnectionFactory::Http(_) => "http",
        }
    }
}

/// HTTP connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConnectionFactory {
    /// Keep HTTP/1.1 connections alive between requests.
    pub keep_alive: bool,

    /// Maximum concurrent HTTP/2 streams per connection.
    pub max_concurrent_streams: Option<u32>,
}

impl Default for HttpConnectionFactory {
    fn default() -> Self {
        Self {
            keep_alive: true,
            max_concurrent_streams: None,
        }
    }
}

/// Timer settings for requests and shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Scheduler {
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Time allowed for in-flight connections to finish on stop.
    pub shutdown_grace_secs: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Smallest HTTP/1 read buffer hyper accepts.
pub const MIN_BUF_SIZE: usize = 8192;

/// I/O buffer limits for HTTP connections.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BufferPool {
    /// Upper bound of the per-connection HTTP/1 read buffer in bytes.
    pub max_buf_size: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self {
            max_buf_size: 400 * 1024,
        }
    }
}

/// Settings applied to every accepted socket.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm.
    pub no_delay: bool,

    /// TCP keepalive idle time in seconds.
    pub keepalive_secs: Option<u64>,

    /// Force buffer-size diagnostic records on or off.
    /// When unset, follows whether debug logging is enabled at startup.
    pub diagnostics: Option<bool>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            no_delay: true,
            keepalive_secs: None,
            diagnostics: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
