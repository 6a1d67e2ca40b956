//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the authoritative endpoint list of every service
//! - Apply live outcomes and probe results to endpoints
//! - Turn every health flip into exactly one log line and metric update

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ProxyConfig, ValidationError};
use crate::health::passive::PassivePolicy;
use crate::health::state::{HealthState, HealthThresholds, HealthTransition, TransitionCause};
use crate::load_balancer::endpoint::{parse_authority, Endpoint, EndpointSnapshot};
use crate::observability::metrics;

/// The endpoints of one service plus its forwarding policy.
#[derive(Debug)]
pub struct ServicePool {
    name: Arc<str>,
    endpoints: Vec<Arc<Endpoint>>,
    cursor: AtomicUsize,
    attempt_timeout: Duration,
    max_retries: u32,
}

impl ServicePool {
    pub fn new(
        name: impl Into<Arc<str>>,
        endpoints: Vec<Arc<Endpoint>>,
        attempt_timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            name: name.into(),
            endpoints,
            cursor: AtomicUsize::new(0),
            attempt_timeout,
            max_retries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoints in configuration order.
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Advance the rotation cursor shared by every selection for this service.
    pub fn next_cursor(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed)
    }

    pub fn healthy_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.is_healthy()).count()
    }
}

/// All services and their endpoints.
#[derive(Debug)]
pub struct BackendPool {
    services: BTreeMap<String, Arc<ServicePool>>,
    passive: PassivePolicy,
    thresholds: HealthThresholds,
}

impl BackendPool {
    pub fn new(
        services: Vec<ServicePool>,
        passive: PassivePolicy,
        thresholds: HealthThresholds,
    ) -> Self {
        let services = services
            .into_iter()
            .map(|pool| (pool.name().to_string(), Arc::new(pool)))
            .collect();
        Self {
            services,
            passive,
            thresholds,
        }
    }

    /// Build every service pool from configuration.
    ///
    /// Addresses are parsed again here so a pool can never hold an endpoint
    /// that validation would have rejected.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ValidationError> {
        let mut services = Vec::with_capacity(config.services.len());
        for (name, service) in &config.services {
            if service.endpoints.is_empty() {
                return Err(ValidationError::NoEndpoints(name.clone()));
            }
            let name: Arc<str> = Arc::from(name.as_str());
            let mut endpoints = Vec::with_capacity(service.endpoints.len());
            for address in &service.endpoints {
                let authority =
                    parse_authority(address).ok_or_else(|| ValidationError::InvalidEndpoint {
                        service: name.to_string(),
                        address: address.clone(),
                    })?;
                let endpoint = Endpoint::new(name.clone(), authority, config.admission.max_in_flight);
                metrics::record_endpoint_health(&name, endpoint.address(), true);
                endpoints.push(Arc::new(endpoint));
            }
            services.push(ServicePool::new(
                name,
                endpoints,
                config.attempt_timeout(service),
                config.max_retries(service),
            ));
        }

        Ok(Self::new(
            services,
            PassivePolicy::from_config(config),
            HealthThresholds::from(&config.health_check),
        ))
    }

    pub fn service(&self, name: &str) -> Option<&Arc<ServicePool>> {
        self.services.get(name)
    }

    /// Services in name order.
    pub fn services(&self) -> impl Iterator<Item = &Arc<ServicePool>> {
        self.services.values()
    }

    /// Every endpoint of a service, healthy or not, in configuration order.
    pub fn snapshot(&self, service: &str) -> Option<Vec<EndpointSnapshot>> {
        self.services
            .get(service)
            .map(|pool| pool.endpoints.iter().map(|e| e.snapshot()).collect())
    }

    /// Every endpoint of every service (for health checking).
    pub fn all_endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.services
            .values()
            .flat_map(|pool| pool.endpoints.iter())
            .cloned()
            .collect()
    }

    /// Record the outcome of one forwarding attempt.
    pub fn mark_result(
        &self,
        endpoint: &Endpoint,
        success: bool,
        latency: Duration,
    ) -> Option<HealthTransition> {
        let to = endpoint.record_result(success, latency, self.passive)?;
        Some(self.emit(endpoint, to, TransitionCause::LiveTraffic))
    }

    /// Write the health flag directly.
    pub fn mark_health(&self, endpoint: &Endpoint, healthy: bool) -> Option<HealthTransition> {
        let to = endpoint.set_health(healthy)?;
        Some(self.emit(endpoint, to, TransitionCause::Manual))
    }

    /// Fold one probe result into the endpoint's hysteresis.
    pub fn record_probe(&self, endpoint: &Endpoint, ok: bool) -> Option<HealthTransition> {
        let to = endpoint.record_probe(ok, self.thresholds)?;
        Some(self.emit(endpoint, to, TransitionCause::Probe))
    }

    fn emit(&self, endpoint: &Endpoint, to: HealthState, cause: TransitionCause) -> HealthTransition {
        let from = match to {
            HealthState::Healthy => HealthState::Unhealthy,
            HealthState::Unhealthy => HealthState::Healthy,
        };
        match to {
            HealthState::Unhealthy => tracing::warn!(
                service = endpoint.service(),
                endpoint = endpoint.address(),
                cause = cause.as_str(),
                consecutive_failures = endpoint.consecutive_failures(),
                "Endpoint marked unhealthy"
            ),
            HealthState::Healthy => tracing::info!(
                service = endpoint.service(),
                endpoint = endpoint.address(),
                cause = cause.as_str(),
                "Endpoint recovered"
            ),
        }
        metrics::record_health_transition(endpoint.service(), endpoint.address(), to, cause);

        HealthTransition {
            service: Arc::from(endpoint.service()),
            endpoint: endpoint.address().to_string(),
            from,
            to,
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;

    fn pool() -> BackendPool {
        let mut config = ProxyConfig::empty();
        config.services.insert(
            "orders".into(),
            ServiceConfig::new("/orders", vec!["127.0.0.1:9001".into(), "127.0.0.1:9002".into()]),
        );
        BackendPool::from_config(&config).unwrap()
    }

    #[test]
    fn snapshot_keeps_configuration_order() {
        let pool = pool();
        let snapshot = pool.snapshot("orders").unwrap();
        let addresses: Vec<_> = snapshot.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, ["127.0.0.1:9001", "127.0.0.1:9002"]);
        assert!(pool.snapshot("missing").is_none());
    }

    #[test]
    fn live_failures_emit_one_transition() {
        let pool = pool();
        let endpoint = pool.service("orders").unwrap().endpoints()[0].clone();
        let ms = Duration::from_millis(1);

        assert!(pool.mark_result(&endpoint, false, ms).is_none());
        assert!(pool.mark_result(&endpoint, false, ms).is_none());
        let transition = pool.mark_result(&endpoint, false, ms).unwrap();
        assert_eq!(transition.to, HealthState::Unhealthy);
        assert_eq!(transition.cause, TransitionCause::LiveTraffic);
        assert!(pool.mark_result(&endpoint, false, ms).is_none());

        let snapshot = pool.snapshot("orders").unwrap();
        assert!(!snapshot[0].healthy);
        assert!(snapshot[1].healthy);
    }

    #[test]
    fn mark_health_is_idempotent() {
        let pool = pool();
        let endpoint = pool.service("orders").unwrap().endpoints()[1].clone();
        let transition = pool.mark_health(&endpoint, false).unwrap();
        assert_eq!(transition.from, HealthState::Healthy);
        assert_eq!(transition.endpoint, "127.0.0.1:9002");
        assert!(pool.mark_health(&endpoint, false).is_none());
        assert_eq!(pool.service("orders").unwrap().healthy_count(), 1);
    }

    #[test]
    fn rejects_bad_addresses() {
        let mut config = ProxyConfig::empty();
        config
            .services
            .insert("bad".into(), ServiceConfig::new("/bad", vec!["ftp://x:1".into()]));
        assert!(matches!(
            BackendPool::from_config(&config),
            Err(ValidationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn per_service_overrides_apply() {
        let mut config = ProxyConfig::empty();
        let mut service = ServiceConfig::new("/slow", vec!["127.0.0.1:9001".into()]);
        service.timeout_ms = Some(250);
        service.max_retries = Some(0);
        config.services.insert("slow".into(), service);

        let pool = BackendPool::from_config(&config).unwrap();
        let slow = pool.service("slow").unwrap();
        assert_eq!(slow.attempt_timeout(), Duration::from_millis(250));
        assert_eq!(slow.max_retries(), 0);
    }
}
