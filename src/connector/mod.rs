//! Connector subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectorBuilder (server + optional settings)
//!     → factory.rs (effective factory chain)
//!     → ConfiguredConnector::start
//!         → net::Listener (bind, one handle per acceptor)
//!         → axum-server accept loops on the executor
//!             → ConfiguringAcceptor (socket hook) → [TLS] → HTTP
//!     → RunningConnector (address, live connections, join)
//! ```
//!
//! # Design Decisions
//! - Construction opens no sockets; binding happens in `start`
//! - Without an executor the connector owns a runtime sized by `selectors`
//! - Stopping the owning `Server` drains every acceptor through one handle

pub mod builder;
pub mod factory;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::accept::DefaultAcceptor;
use axum_server::tls_rustls::RustlsAcceptor;
use axum_server::Handle;
use thiserror::Error;
use tokio::runtime::{self, Runtime};
use tokio::task::JoinHandle;

use crate::config::{BufferPool, HttpConnectionFactory, Scheduler};
use crate::http::with_middleware;
use crate::lifecycle::{Server, Shutdown};
use crate::net::configurator::SocketConfigurator;
use crate::net::tls::load_tls_config;
use crate::net::{ConfiguringAcceptor, Listener, ListenerError};

pub use builder::ConnectorBuilder;
pub use factory::FactoryChain;

/// Error type for connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("invalid connection factory chain [{0}]")]
    InvalidFactoryChain(String),

    #[error("{field} must be -1 (auto) or at least 1, got {value}")]
    ThreadCount { field: &'static str, value: i32 },

    #[error("failed to load TLS material: {0}")]
    Tls(#[source] io::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to build connector runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("acceptor failed: {0}")]
    Serve(#[source] io::Error),

    #[error("acceptor task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A listening connector bound to a [`Server`].
///
/// Accepted sockets pass through the configured [`SocketConfigurator`]
/// (by default a [`crate::net::BufferSizeConfigurator`]) before reaching the
/// factory chain.
pub struct ConfiguredConnector {
    server: Server,
    bind_address: String,
    backlog: u32,
    acceptors: usize,
    selectors: usize,
    executor: Option<runtime::Handle>,
    scheduler: Scheduler,
    buffer_pool: BufferPool,
    chain: FactoryChain,
    configurator: Arc<dyn SocketConfigurator>,
}

impl ConfiguredConnector {
    pub fn builder(server: Server) -> ConnectorBuilder {
        ConnectorBuilder::new(server)
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn acceptors(&self) -> usize {
        self.acceptors
    }

    pub fn selectors(&self) -> usize {
        self.selectors
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn factories(&self) -> &FactoryChain {
        &self.chain
    }

    /// Bind and start accepting, serving `app` on every connection.
    pub async fn start(self, app: Router) -> Result<RunningConnector, ConnectorError> {
        let tls = match self.chain.tls() {
            Some(tls) => Some(load_tls_config(tls).await.map_err(ConnectorError::Tls)?),
            None => None,
        };
        let default_http = HttpConnectionFactory::default();
        let http = self.chain.http().unwrap_or(&default_http);

        let listener = Listener::bind(&self.bind_address, self.backlog)?;
        let local_addr = listener.local_addr().map_err(ListenerError::from)?;
        let std_listeners = listener.handles(self.acceptors).map_err(ListenerError::from)?;

        // Nothing below may fail: an owned runtime must not drop in async context.
        let (runtime, executor) = match self.executor.clone() {
            Some(executor) => (None, executor),
            None => {
                let runtime = build_runtime(self.selectors).map_err(ConnectorError::Runtime)?;
                let executor = runtime.handle().clone();
                (Some(runtime), executor)
            }
        };

        let app = with_middleware(app, &self.scheduler);
        let handle = Handle::new();
        let mut tasks = Vec::with_capacity(self.acceptors);

        for std_listener in std_listeners {
            let mut server = axum_server::from_tcp(std_listener).handle(handle.clone());
            factory::configure_http(server.http_builder(), http, &self.buffer_pool);
            let make_service = app.clone().into_make_service_with_connect_info::<SocketAddr>();

            let task = match &tls {
                Some(tls) => {
                    let acceptor = ConfiguringAcceptor::new(
                        RustlsAcceptor::new(tls.clone()),
                        self.configurator.clone(),
                    );
                    executor.spawn(server.acceptor(acceptor).serve(make_service))
                }
                None => {
                    let acceptor =
                        ConfiguringAcceptor::new(DefaultAcceptor::new(), self.configurator.clone());
                    executor.spawn(server.acceptor(acceptor).serve(make_service))
                }
            };
            tasks.push(task);
        }

        let stop = self.server.stop_receiver();
        let grace = Duration::from_secs(self.scheduler.shutdown_grace_secs);
        let drain = handle.clone();
        executor.spawn(async move {
            Shutdown::triggered(stop).await;
            tracing::info!(grace_secs = grace.as_secs(), "Connector draining");
            drain.graceful_shutdown(Some(grace));
        });

        tracing::info!(
            address = %local_addr,
            acceptors = self.acceptors,
            owns_runtime = runtime.is_some(),
            protocols = %self.chain,
            "Connector started"
        );

        Ok(RunningConnector {
            local_addr,
            handle,
            tasks,
            runtime,
        })
    }
}

fn build_runtime(selectors: usize) -> io::Result<Runtime> {
    runtime::Builder::new_multi_thread()
        .worker_threads(selectors)
        .thread_name("connector-selector")
        .enable_all()
        .build()
}

/// A started connector.
pub struct RunningConnector {
    local_addr: SocketAddr,
    handle: Handle,
    tasks: Vec<JoinHandle<io::Result<()>>>,
    runtime: Option<Runtime>,
}

impl RunningConnector {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections currently being served.
    pub fn connection_count(&self) -> usize {
        self.handle.connection_count()
    }

    /// Wait until every acceptor has stopped and drained.
    pub async fn join(mut self) -> Result<(), ConnectorError> {
        let mut result = Ok(());
        for task in std::mem::take(&mut self.tasks) {
            let outcome = match task.await {
                Ok(served) => served.map_err(ConnectorError::Serve),
                Err(e) => Err(ConnectorError::Task(e)),
            };
            if let Err(e) = outcome {
                tracing::error!(error = %e, "Acceptor stopped with error");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        tracing::info!(address = %self.local_addr, "Connector stopped");
        result
    }
}

impl Drop for RunningConnector {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
