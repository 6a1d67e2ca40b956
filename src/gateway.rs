//! Gateway core.
//!
//! Built once from a validated configuration; everything it owns is shared
//! by `Arc` with the HTTP front, the admin listener and the health monitor.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → RouteTable::resolve (service + rewritten path)
//!     → ForwardingEngine::forward (LoadBalancer::select, admission, retry)
//!     → response, or GatewayError translated once into a JSON error
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::forwarding::ForwardingEngine;
use crate::health::{HealthMonitor, HealthReport};
use crate::http::request::request_id;
use crate::load_balancer::{BackendPool, LoadBalancer};
use crate::observability::metrics;
use crate::routing::RouteTable;

#[derive(Debug, Clone)]
pub struct Gateway {
    routes: Arc<RouteTable>,
    pool: Arc<BackendPool>,
    engine: ForwardingEngine,
}

impl Gateway {
    /// Validate `config` and build the route table, pool, balancer and engine.
    pub fn build(config: &ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(config)?;

        let routes = RouteTable::from_config(config).map_err(|e| ConfigError::from(vec![e]))?;
        let pool = Arc::new(BackendPool::from_config(config).map_err(|e| ConfigError::from(vec![e]))?);
        let balancer = Arc::new(LoadBalancer::from_config(pool.clone(), &config.load_balancing));
        let engine = ForwardingEngine::from_config(balancer, config);

        tracing::info!(
            services = pool.services().count(),
            endpoints = pool.all_endpoints().len(),
            strategy = ?config.load_balancing.strategy,
            fallback = ?config.load_balancing.fallback,
            "Gateway built"
        );

        Ok(Self {
            routes: Arc::new(routes),
            pool,
            engine,
        })
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Health monitor over this gateway's pool.
    pub fn health_monitor(&self, config: &ProxyConfig) -> HealthMonitor {
        HealthMonitor::new(self.pool.clone(), config.health_check.clone())
    }

    pub fn health_report(&self) -> HealthReport {
        HealthReport::from_pool(&self.pool)
    }

    /// Route and forward one request. Errors are turned into responses here.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let request_id = request_id(request.headers()).to_string();

        tracing::info!(request_id = %request_id, method = %method, path = %path, "Request started");

        let resolved = self.routes.resolve(&path, request.uri().query());
        let (service, result) = match resolved {
            Ok(route) => {
                let result = self.engine.forward(request, &route).await;
                (route.service.to_string(), result)
            }
            Err(err) => ("none".to_string(), Err(err)),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id,
                    service = %service,
                    kind = err.kind(),
                    error = %err,
                    "Request failed"
                );
                err.into_response()
            }
        };

        let status = response.status().as_u16();
        metrics::record_request(&service, method.as_str(), status, start);
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            service = %service,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );

        response
    }
}
