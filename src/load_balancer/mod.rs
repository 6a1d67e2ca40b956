//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → service name identified
//!     → pool.rs (service endpoints, rotation cursor)
//!     → Drop endpoints already tried by this request
//!     → Apply strategy over healthy candidates:
//!         - least_loaded.rs (in-flight / success rate, then latency)
//!         - round_robin.rs (rotate through endpoints)
//!     → Nothing healthy: fallback.rs (degrade) or NoEndpointAvailable (strict)
//!     → Return endpoint
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless; the pool owns the cursor and the counters
//! - Unhealthy endpoints excluded from selection
//! - Admission (the in-flight slot) is taken by the forwarding engine, not here

pub mod endpoint;
pub mod fallback;
pub mod least_loaded;
pub mod pool;
pub mod round_robin;

use std::sync::Arc;

use crate::config::{FallbackMode, LoadBalancingConfig, Strategy};
use crate::error::GatewayError;

pub use endpoint::{Endpoint, EndpointSnapshot, InFlightGuard};
pub use pool::{BackendPool, ServicePool};

/// Picks one endpoint out of a candidate list.
pub trait SelectionStrategy: Send + Sync + std::fmt::Debug {
    /// Select a healthy candidate, using `cursor` to rotate among equals.
    fn next_server(&self, candidates: &[Arc<Endpoint>], cursor: usize) -> Option<Arc<Endpoint>>;
}

/// Health-aware endpoint selection over the backend pool.
#[derive(Debug)]
pub struct LoadBalancer {
    pool: Arc<BackendPool>,
    strategy: Box<dyn SelectionStrategy>,
    fallback: FallbackMode,
}

impl LoadBalancer {
    pub fn new(pool: Arc<BackendPool>, strategy: Box<dyn SelectionStrategy>, fallback: FallbackMode) -> Self {
        Self {
            pool,
            strategy,
            fallback,
        }
    }

    pub fn from_config(pool: Arc<BackendPool>, config: &LoadBalancingConfig) -> Self {
        let strategy: Box<dyn SelectionStrategy> = match config.strategy {
            Strategy::LeastLoaded => Box::new(least_loaded::LeastLoaded::new()),
            Strategy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
        };
        Self::new(pool, strategy, config.fallback)
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Select an endpoint of `service`, avoiding those in `exclude`.
    ///
    /// If every endpoint is excluded the exclusion list is ignored, so a
    /// single-endpoint service can still be retried.
    pub fn select(&self, service: &str, exclude: &[Arc<Endpoint>]) -> Result<Arc<Endpoint>, GatewayError> {
        let pool = self
            .pool
            .service(service)
            .ok_or_else(|| GatewayError::NoEndpointAvailable(service.to_string()))?;

        let mut candidates: Vec<Arc<Endpoint>> = pool
            .endpoints()
            .iter()
            .filter(|e| !exclude.iter().any(|x| Arc::ptr_eq(x, e)))
            .cloned()
            .collect();
        if candidates.is_empty() {
            candidates = pool.endpoints().to_vec();
        }

        let cursor = pool.next_cursor();
        if let Some(endpoint) = self.strategy.next_server(&candidates, cursor) {
            return Ok(endpoint);
        }

        match self.fallback {
            FallbackMode::Degrade => {
                let endpoint = fallback::fewest_failures(&candidates)
                    .ok_or_else(|| GatewayError::NoEndpointAvailable(service.to_string()))?;
                tracing::warn!(
                    service,
                    endpoint = endpoint.address(),
                    "No healthy endpoint, degrading to least-failed endpoint"
                );
                Ok(endpoint)
            }
            FallbackMode::Strict => {
                tracing::debug!(service, endpoints = candidates.len(), "No healthy endpoint");
                Err(GatewayError::NoEndpointAvailable(service.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProxyConfig, ServiceConfig};
    use std::time::Duration;

    fn balancer(strategy: Strategy, fallback: FallbackMode) -> LoadBalancer {
        let mut config = ProxyConfig::empty();
        config.services.insert(
            "payments".into(),
            ServiceConfig::new("/payments", vec!["127.0.0.1:9001".into(), "127.0.0.1:9002".into()]),
        );
        config.load_balancing.strategy = strategy;
        config.load_balancing.fallback = fallback;
        let pool = Arc::new(BackendPool::from_config(&config).unwrap());
        LoadBalancer::from_config(pool, &config.load_balancing)
    }

    fn endpoints(lb: &LoadBalancer) -> Vec<Arc<Endpoint>> {
        lb.pool().service("payments").unwrap().endpoints().to_vec()
    }

    fn fail(lb: &LoadBalancer, endpoint: &Endpoint, times: usize) {
        for _ in 0..times {
            lb.pool().mark_result(endpoint, false, Duration::from_millis(1));
        }
    }

    #[test]
    fn unknown_service_has_no_endpoint() {
        let lb = balancer(Strategy::LeastLoaded, FallbackMode::Degrade);
        assert!(matches!(lb.select("nope", &[]), Err(GatewayError::NoEndpointAvailable(_))));
    }

    #[test]
    fn exclusion_moves_to_other_endpoint() {
        let lb = balancer(Strategy::RoundRobin, FallbackMode::Strict);
        let eps = endpoints(&lb);
        for _ in 0..4 {
            let picked = lb.select("payments", &[eps[0].clone()]).unwrap();
            assert!(Arc::ptr_eq(&picked, &eps[1]));
        }
    }

    #[test]
    fn excluding_everything_ignores_exclusion() {
        let lb = balancer(Strategy::LeastLoaded, FallbackMode::Strict);
        let eps = endpoints(&lb);
        assert!(lb.select("payments", &eps).is_ok());
    }

    #[test]
    fn all_unhealthy_strict_is_unavailable() {
        let lb = balancer(Strategy::LeastLoaded, FallbackMode::Strict);
        let eps = endpoints(&lb);
        fail(&lb, &eps[0], 3);
        fail(&lb, &eps[1], 3);
        let err = lb.select("payments", &[]).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn all_unhealthy_degrade_picks_fewest_failures() {
        let lb = balancer(Strategy::LeastLoaded, FallbackMode::Degrade);
        let eps = endpoints(&lb);
        fail(&lb, &eps[0], 5);
        fail(&lb, &eps[1], 3);
        let picked = lb.select("payments", &[]).unwrap();
        assert!(Arc::ptr_eq(&picked, &eps[1]));
    }

    #[test]
    fn round_robin_alternates() {
        let lb = balancer(Strategy::RoundRobin, FallbackMode::Degrade);
        let first = lb.select("payments", &[]).unwrap();
        let second = lb.select("payments", &[]).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
