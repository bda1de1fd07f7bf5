//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! All errors are collected, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{ConnectionFactory, ServerConfig, TlsConfig, AUTO, MIN_BUF_SIZE};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("{field} must be -1 (auto) or at least 1, got {value}")]
    ThreadCount { field: &'static str, value: i32 },

    #[error("backlog must be greater than zero")]
    Backlog,

    #[error("request timeout must be greater than zero")]
    RequestTimeout,

    #[error("buffer pool max_buf_size must be at least 8192")]
    BufferSize,

    #[error("TLS {0} path is empty")]
    TlsPath(&'static str),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let connector = &config.connector;

    if connector.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(connector.bind_address.clone()));
    }

    for (field, value) in [("acceptors", connector.acceptors), ("selectors", connector.selectors)] {
        if value != AUTO && value < 1 {
            errors.push(ValidationError::ThreadCount { field, value });
        }
    }

    if connector.backlog == 0 {
        errors.push(ValidationError::Backlog);
    }
    if connector.scheduler.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if connector.buffer_pool.max_buf_size < MIN_BUF_SIZE {
        errors.push(ValidationError::BufferSize);
    }

    let factory_tls = connector.factories.iter().filter_map(|f| match f {
        ConnectionFactory::Tls(tls) => Some(tls),
        ConnectionFactory::Http(_) => None,
    });
    let tls_configs = connector.tls.iter().chain(factory_tls);
    for tls in tls_configs {
        check_tls(tls, &mut errors);
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_tls(tls: &TlsConfig, errors: &mut Vec<ValidationError>) {
    if tls.cert_path.trim().is_empty() {
        errors.push(ValidationError::TlsPath("certificate"));
    }
    if tls.key_path.trim().is_empty() {
        errors.push(ValidationError::TlsPath("key"));
    }
}
