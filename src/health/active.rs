//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every endpoint with `GET <path>`
//! - Feed results into the endpoints' hysteresis
//!
//! # Lifecycle
//! `spawn` → tick every `interval_ms` → on shutdown, the pass in progress
//! finishes and the task exits.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::state::HealthTransition;
use crate::load_balancer::{BackendPool, Endpoint};

const USER_AGENT: &str = "api-gateway-health-check";

pub struct HealthMonitor {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    /// The monitor gets its own client; probes never share connections with forwarding.
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.timeout_ms)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            pool,
            config,
            client,
        }
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every endpoint once, concurrently. Returns the transitions of this pass.
    pub async fn check_all(&self) -> Vec<HealthTransition> {
        let endpoints = self.pool.all_endpoints();
        let results = join_all(endpoints.iter().map(|endpoint| self.probe(endpoint))).await;

        endpoints
            .iter()
            .zip(results)
            .filter_map(|(endpoint, ok)| self.pool.record_probe(endpoint, ok))
            .collect()
    }

    async fn probe(&self, endpoint: &Endpoint) -> bool {
        let address = endpoint.address();
        let request = match endpoint.uri_for(&self.config.path).and_then(|uri| {
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .header(header::USER_AGENT, USER_AGENT)
                .body(Body::empty())
        }) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(endpoint = address, error = %e, "Failed to build health check request");
                return false;
            }
        };

        let timeout = Duration::from_millis(self.config.timeout_ms);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => true,
            Ok(Ok(response)) => {
                tracing::debug!(endpoint = address, status = %response.status(), "Health check failed: non-success status");
                false
            }
            Ok(Err(e)) => {
                tracing::debug!(endpoint = address, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(endpoint = address, ?timeout, "Health check failed: timeout");
                false
            }
        }
    }
}
