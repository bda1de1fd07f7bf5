//! Connection factory chain.
//!
//! A chain is the ordered list of protocol handlers an accepted connection
//! passes through: optionally TLS termination, then HTTP.

use std::fmt;

use hyper_util::rt::TokioExecutor;
use hyper_util::server::conn::auto;

use crate::config::{BufferPool, ConnectionFactory, HttpConnectionFactory, TlsConfig, MIN_BUF_SIZE};
use crate::connector::ConnectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryChain(Vec<ConnectionFactory>);

impl FactoryChain {
    /// Effective chain for an optional TLS factory and explicit factories.
    ///
    /// With no explicit factories a default HTTP factory is used. A TLS
    /// factory, when given, always comes first.
    pub fn resolve(tls: Option<TlsConfig>, factories: Vec<ConnectionFactory>) -> Self {
        let factories = if factories.is_empty() {
            vec![ConnectionFactory::Http(HttpConnectionFactory::default())]
        } else {
            factories
        };

        let mut chain = Vec::with_capacity(factories.len() + 1);
        chain.extend(tls.map(ConnectionFactory::Tls));
        chain.extend(factories);
        Self(chain)
    }

    /// Check the chain is servable: TLS only in front, exactly one HTTP
    /// factory, HTTP last.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        let invalid = |reason: &str| {
            Err(ConnectorError::InvalidFactoryChain(format!("{self}: {reason}")))
        };

        if self.0.iter().skip(1).any(|f| matches!(f, ConnectionFactory::Tls(_))) {
            return invalid("TLS must be the first factory");
        }
        match self.0.iter().filter(|f| matches!(f, ConnectionFactory::Http(_))).count() {
            0 => return invalid("no HTTP factory"),
            1 => {}
            _ => return invalid("more than one HTTP factory"),
        }
        if !matches!(self.0.last(), Some(ConnectionFactory::Http(_))) {
            return invalid("HTTP must be the last factory");
        }
        Ok(())
    }

    pub fn factories(&self) -> &[ConnectionFactory] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// TLS settings, if the chain starts with TLS termination.
    pub fn tls(&self) -> Option<&TlsConfig> {
        match self.0.first() {
            Some(ConnectionFactory::Tls(tls)) => Some(tls),
            _ => None,
        }
    }

    pub fn http(&self) -> Option<&HttpConnectionFactory> {
        self.0.iter().find_map(|f| match f {
            ConnectionFactory::Http(http) => Some(http),
            ConnectionFactory::Tls(_) => None,
        })
    }
}

impl fmt::Display for FactoryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, factory) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", factory.protocol())?;
        }
        Ok(())
    }
}

/// Apply HTTP factory and buffer settings to a hyper connection builder.
pub(crate) fn configure_http(
    builder: &mut auto::Builder<TokioExecutor>,
    http: &HttpConnectionFactory,
    buffer_pool: &BufferPool,
) {
    builder
        .http1()
        .keep_alive(http.keep_alive)
        .max_buf_size(buffer_pool.max_buf_size.max(MIN_BUF_SIZE));
    builder.http2().max_concurrent_streams(http.max_concurrent_streams);
}
