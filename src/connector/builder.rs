//! Connector construction.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::{
    BufferPool, ConnectionFactory, Scheduler, ServerConfig, SocketConfig, TlsConfig, AUTO,
};
use crate::connector::factory::FactoryChain;
use crate::connector::{ConfiguredConnector, ConnectorError};
use crate::lifecycle::Server;
use crate::net::configurator::{BufferSizeConfigurator, SocketConfigurator};

/// Builder for [`ConfiguredConnector`]. Every field except the server is
/// optional.
pub struct ConnectorBuilder {
    server: Server,
    bind_address: String,
    backlog: u32,
    acceptors: i32,
    selectors: i32,
    executor: Option<Handle>,
    scheduler: Option<Scheduler>,
    buffer_pool: Option<BufferPool>,
    tls: Option<TlsConfig>,
    factories: Vec<ConnectionFactory>,
    socket: SocketConfig,
    configurator: Option<Arc<dyn SocketConfigurator>>,
}

impl ConnectorBuilder {
    pub(crate) fn new(server: Server) -> Self {
        Self {
            server,
            bind_address: "0.0.0.0:8080".to_string(),
            backlog: 1024,
            acceptors: AUTO,
            selectors: AUTO,
            executor: None,
            scheduler: None,
            buffer_pool: None,
            tls: None,
            factories: Vec::new(),
            socket: SocketConfig::default(),
            configurator: None,
        }
    }

    /// Start from a loaded configuration file.
    pub fn from_config(server: Server, config: &ServerConfig) -> Self {
        let connector = &config.connector;
        let mut builder = Self::new(server)
            .bind_address(connector.bind_address.clone())
            .backlog(connector.backlog)
            .acceptors(connector.acceptors)
            .selectors(connector.selectors)
            .scheduler(connector.scheduler.clone())
            .buffer_pool(connector.buffer_pool.clone())
            .factories(connector.factories.iter().cloned())
            .socket(config.socket.clone());
        builder.tls = connector.tls.clone();
        builder
    }

    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Number of accept loops; -1 sizes automatically.
    pub fn acceptors(mut self, acceptors: i32) -> Self {
        self.acceptors = acceptors;
        self
    }

    /// Number of I/O worker threads; -1 sizes automatically. Ignored when an
    /// executor is supplied.
    pub fn selectors(mut self, selectors: i32) -> Self {
        self.selectors = selectors;
        self
    }

    /// Run accept loops and connections on an existing runtime.
    pub fn executor(mut self, executor: Handle) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn buffer_pool(mut self, buffer_pool: BufferPool) -> Self {
        self.buffer_pool = Some(buffer_pool);
        self
    }

    /// Terminate TLS in front of the factory chain.
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn factory(mut self, factory: ConnectionFactory) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn factories(mut self, factories: impl IntoIterator<Item = ConnectionFactory>) -> Self {
        self.factories.extend(factories);
        self
    }

    /// Socket settings for the default buffer-size configurator.
    pub fn socket(mut self, socket: SocketConfig) -> Self {
        self.socket = socket;
        self
    }

    /// Replace the post-accept hook.
    pub fn configurator(mut self, configurator: Arc<dyn SocketConfigurator>) -> Self {
        self.configurator = Some(configurator);
        self
    }

    pub fn build(self) -> Result<ConfiguredConnector, ConnectorError> {
        let acceptors = resolve_threads("acceptors", self.acceptors, auto_acceptors)?;
        let selectors = resolve_threads("selectors", self.selectors, auto_selectors)?;

        let chain = FactoryChain::resolve(self.tls, self.factories);
        chain.validate()?;

        let configurator = match self.configurator {
            Some(configurator) => configurator,
            None => Arc::new(BufferSizeConfigurator::from_config(&self.socket)),
        };

        Ok(ConfiguredConnector {
            server: self.server,
            bind_address: self.bind_address,
            backlog: self.backlog,
            acceptors,
            selectors,
            executor: self.executor,
            scheduler: self.scheduler.unwrap_or_default(),
            buffer_pool: self.buffer_pool.unwrap_or_default(),
            chain,
            configurator,
        })
    }
}

fn resolve_threads(
    field: &'static str,
    value: i32,
    auto: fn(usize) -> usize,
) -> Result<usize, ConnectorError> {
    match value {
        AUTO => Ok(auto(available_cores())),
        n if n >= 1 => Ok(n as usize),
        value => Err(ConnectorError::ThreadCount { field, value }),
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

pub(crate) fn auto_acceptors(cores: usize) -> usize {
    (cores / 8).clamp(1, 4)
}

pub(crate) fn auto_selectors(cores: usize) -> usize {
    (cores / 2).clamp(1, 4)
}
