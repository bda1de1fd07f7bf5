//! HTTP application setup.
//!
//! # Responsibilities
//! - Default Axum router served by the binary
//! - Middleware shared by every connector (tracing, request timeout)

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::ConnectInfo,
    http::{Method, Uri},
    routing::{any, get},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Scheduler;

/// Default application: `/health` and an echo handler for everything else.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", any(echo))
        .route("/{*path}", any(echo))
}

/// Wrap `app` with the layers every connector applies.
#[allow(deprecated)]
pub fn with_middleware(app: Router, scheduler: &Scheduler) -> Router {
    app.layer(TimeoutLayer::new(Duration::from_secs(scheduler.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn echo(ConnectInfo(peer): ConnectInfo<SocketAddr>, method: Method, uri: Uri) -> String {
    tracing::debug!(peer_addr = %peer, method = %method, uri = %uri, "Echo request");
    format!("{method} {uri} from {peer}\n")
}
