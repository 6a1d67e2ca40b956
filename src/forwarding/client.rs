//! Upstream HTTP client for forwarding.

use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::{TimeoutConfig, UpstreamConfig};

pub type UpstreamClient = Client<HttpConnector, Body>;

/// Response head plus the still-streaming upstream body.
pub type UpstreamResponse = Response<Incoming>;

/// HTTP/1.1 client with a per-host keep-alive pool and a connect timeout.
pub fn build_client(timeouts: &TimeoutConfig, upstream: &UpstreamConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_millis(timeouts.connect_ms)));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new())
        .pool_timer(TokioTimer::new())
        .pool_max_idle_per_host(upstream.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(upstream.pool_idle_timeout_secs))
        .build(connector)
}
