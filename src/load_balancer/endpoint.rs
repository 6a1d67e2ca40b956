//! Endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream instance of a service
//! - Track in-flight requests (for load-aware balancing)
//! - Hold the admission slots that cap concurrency
//! - Track health, consecutive failures, decayed latency and success rate
//!
//! # Synchronization
//! `in_flight` is an atomic. Every other mutable field lives behind the
//! endpoint's own mutex, so a forwarding task and the health monitor never
//! interleave updates of one endpoint. The lock is never held across `.await`.

use std::ops::Deref;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::http::uri::{Authority, Uri};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::health::passive::PassivePolicy;
use crate::health::state::{HealthState, HealthThresholds, ProbeStreak};
use crate::observability::metrics;

/// Weight of the newest sample in the decayed averages.
const DECAY: f64 = 0.3;

/// Parse `host:port` or `http://host:port` into an authority.
pub fn parse_authority(address: &str) -> Option<Authority> {
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };
    let url = Url::parse(&candidate).ok()?;
    if url.scheme() != "http" || url.query().is_some() || !matches!(url.path(), "" | "/") {
        return None;
    }
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Authority::from_str(&format!("{}:{}", host, port)).ok()
}

/// Mutable endpoint state, guarded by the endpoint mutex.
#[derive(Debug)]
struct EndpointStats {
    healthy: bool,
    consecutive_failures: u32,
    latency_ms: Option<f64>,
    success_rate: f64,
    last_failure: Option<Instant>,
    probes: ProbeStreak,
}

impl Default for EndpointStats {
    fn default() -> Self {
        Self {
            healthy: true,
            consecutive_failures: 0,
            latency_ms: None,
            success_rate: 1.0,
            last_failure: None,
            probes: ProbeStreak::default(),
        }
    }
}

/// Point-in-time copy of an endpoint, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSnapshot {
    pub address: String,
    pub healthy: bool,
    pub in_flight: usize,
    pub consecutive_failures: u32,
    pub latency_ms: Option<f64>,
    pub success_rate: f64,
}

/// A single upstream endpoint of a service.
#[derive(Debug)]
pub struct Endpoint {
    service: Arc<str>,
    authority: Authority,
    in_flight: AtomicUsize,
    queued: AtomicUsize,
    slots: Arc<Semaphore>,
    stats: Mutex<EndpointStats>,
}

impl Endpoint {
    /// Create a new endpoint allowing `max_in_flight` concurrent requests.
    pub fn new(service: impl Into<Arc<str>>, authority: Authority, max_in_flight: usize) -> Self {
        Self {
            service: service.into(),
            authority,
            in_flight: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            slots: Arc::new(Semaphore::new(max_in_flight)),
            stats: Mutex::new(EndpointStats::default()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// `host:port` of the endpoint.
    pub fn address(&self) -> &str {
        self.authority.as_str()
    }

    /// Absolute upstream URI for `path_and_query`.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme("http")
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }

    fn stats(&self) -> MutexGuard<'_, EndpointStats> {
        // A panic while holding the lock leaves only counters behind; keep serving.
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current number of in-flight requests.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_healthy(&self) -> bool {
        self.stats().healthy
    }

    pub fn health(&self) -> HealthState {
        HealthState::from_healthy(self.is_healthy())
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.stats().consecutive_failures
    }

    /// `in_flight / (1 + recent success rate)`; lower is better.
    pub fn load_score(&self) -> f64 {
        let success_rate = self.stats().success_rate;
        self.in_flight() as f64 / (1.0 + success_rate)
    }

    /// Decayed latency, zero until the first sample.
    pub fn latency_ms(&self) -> f64 {
        self.stats().latency_ms.unwrap_or(0.0)
    }

    /// Sort key for the degraded fallback: fewest failures, then least recently failed.
    pub fn failure_rank(&self) -> (u32, Option<Instant>) {
        let stats = self.stats();
        (stats.consecutive_failures, stats.last_failure)
    }

    pub fn snapshot(&self) -> EndpointSnapshot {
        let stats = self.stats();
        EndpointSnapshot {
            address: self.address().to_string(),
            healthy: stats.healthy,
            in_flight: self.in_flight(),
            consecutive_failures: stats.consecutive_failures,
            latency_ms: stats.latency_ms,
            success_rate: stats.success_rate,
        }
    }

    /// Admission slots shared by all requests to this endpoint.
    pub(crate) fn slots(&self) -> Arc<Semaphore> {
        self.slots.clone()
    }

    /// Reserve a place in the admission queue, bounded by `depth`.
    pub(crate) fn try_enqueue(self: &Arc<Self>, depth: usize) -> Option<QueueTicket> {
        let mut prev = self.queued.load(Ordering::Relaxed);
        loop {
            if prev >= depth {
                return None;
            }
            match self.queued.compare_exchange_weak(
                prev,
                prev + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => prev = x,
            }
        }
        Some(QueueTicket {
            endpoint: self.clone(),
        })
    }

    /// Number of requests waiting for an admission slot.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    /// Fold one live request outcome into the endpoint.
    ///
    /// Returns the new health state if the outcome flipped it.
    pub(crate) fn record_result(
        &self,
        success: bool,
        latency: Duration,
        policy: PassivePolicy,
    ) -> Option<HealthState> {
        let mut stats = self.stats();
        let sample = latency.as_secs_f64() * 1000.0;
        stats.latency_ms = Some(match stats.latency_ms {
            Some(avg) => avg + DECAY * (sample - avg),
            None => sample,
        });
        let outcome = if success { 1.0 } else { 0.0 };
        stats.success_rate += DECAY * (outcome - stats.success_rate);

        if success {
            stats.consecutive_failures = 0;
        } else {
            stats.consecutive_failures = stats.consecutive_failures.saturating_add(1);
            stats.last_failure = Some(Instant::now());
        }

        let flip = policy.evaluate(stats.healthy, success, stats.consecutive_failures)?;
        stats.healthy = flip;
        stats.probes.reset();
        Some(HealthState::from_healthy(flip))
    }

    /// Fold one probe result into the hysteresis.
    pub(crate) fn record_probe(&self, ok: bool, thresholds: HealthThresholds) -> Option<HealthState> {
        let mut stats = self.stats();
        let healthy = stats.healthy;
        let flip = stats.probes.observe(ok, healthy, thresholds)?;
        Self::apply_health(&mut stats, flip);
        Some(HealthState::from_healthy(flip))
    }

    /// Set the health flag directly. Returns the new state if it changed.
    pub(crate) fn set_health(&self, healthy: bool) -> Option<HealthState> {
        let mut stats = self.stats();
        if stats.healthy == healthy {
            return None;
        }
        Self::apply_health(&mut stats, healthy);
        stats.probes.reset();
        Some(HealthState::from_healthy(healthy))
    }

    fn apply_health(stats: &mut EndpointStats, healthy: bool) {
        stats.healthy = healthy;
        if healthy {
            // A restored endpoint starts from a clean failure count, otherwise a
            // single live failure would trip the passive threshold again.
            stats.consecutive_failures = 0;
        }
    }
}

/// RAII guard for one dispatched request.
///
/// Created after admission; increments `in_flight` and holds the admission
/// permit. Dropping it, whether the request finished, timed out or was
/// cancelled, decrements the counter exactly once and frees the slot.
#[derive(Debug)]
pub struct InFlightGuard {
    endpoint: Arc<Endpoint>,
    _permit: OwnedSemaphorePermit,
}

impl InFlightGuard {
    pub(crate) fn new(endpoint: Arc<Endpoint>, permit: OwnedSemaphorePermit) -> Self {
        let current = endpoint.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        metrics::record_in_flight(endpoint.service(), endpoint.address(), current);
        Self {
            endpoint,
            _permit: permit,
        }
    }
}

impl Deref for InFlightGuard {
    type Target = Endpoint;
    fn deref(&self) -> &Self::Target {
        &self.endpoint
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let current = self.endpoint.in_flight.fetch_sub(1, Ordering::AcqRel) - 1;
        metrics::record_in_flight(self.endpoint.service(), self.endpoint.address(), current);
    }
}

/// A place in an endpoint's admission queue; released on drop.
#[derive(Debug)]
pub(crate) struct QueueTicket {
    endpoint: Arc<Endpoint>,
}

impl Drop for QueueTicket {
    fn drop(&mut self) {
        self.endpoint.queued.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn endpoint(addr: &str) -> Arc<Endpoint> {
        Arc::new(Endpoint::new("svc", parse_authority(addr).unwrap(), 10))
    }

    fn guard(endpoint: &Arc<Endpoint>) -> InFlightGuard {
        let permit = endpoint.slots().try_acquire_owned().unwrap();
        InFlightGuard::new(endpoint.clone(), permit)
    }

    #[test]
    fn parses_addresses() {
        assert_eq!(parse_authority("127.0.0.1:8001").unwrap().as_str(), "127.0.0.1:8001");
        assert_eq!(parse_authority("http://localhost:8002").unwrap().as_str(), "localhost:8002");
        assert_eq!(parse_authority("localhost").unwrap().as_str(), "localhost:80");
        assert!(parse_authority("https://secure:443").is_none());
        assert!(parse_authority("http://host:1/path").is_none());
        assert!(parse_authority("not an address").is_none());
    }

    #[test]
    fn guard_releases_exactly_once() {
        let e = endpoint("127.0.0.1:8080");
        let g1 = guard(&e);
        let g2 = guard(&e);
        assert_eq!(e.in_flight(), 2);
        assert_eq!(e.slots().available_permits(), 8);

        drop(g1);
        assert_eq!(e.in_flight(), 1);
        drop(g2);
        assert_eq!(e.in_flight(), 0);
        assert_eq!(e.slots().available_permits(), 10);
    }

    #[test]
    fn three_live_failures_trip_fast_fail() {
        let e = endpoint("127.0.0.1:8080");
        let policy = PassivePolicy::default();
        let ms = Duration::from_millis(5);

        assert_eq!(e.record_result(false, ms, policy), None);
        assert_eq!(e.record_result(false, ms, policy), None);
        assert!(e.is_healthy());
        assert_eq!(e.record_result(false, ms, policy), Some(HealthState::Unhealthy));
        assert!(!e.is_healthy());
        assert_eq!(e.consecutive_failures(), 3);
    }

    #[test]
    fn success_resets_failures() {
        let e = endpoint("127.0.0.1:8080");
        let policy = PassivePolicy::default();
        let ms = Duration::from_millis(5);

        e.record_result(false, ms, policy);
        e.record_result(false, ms, policy);
        e.record_result(true, ms, policy);
        e.record_result(false, ms, policy);
        assert_eq!(e.consecutive_failures(), 1);
        assert!(e.is_healthy());
    }

    #[test]
    fn latency_is_decayed_average() {
        let e = endpoint("127.0.0.1:8080");
        let policy = PassivePolicy::default();

        e.record_result(true, Duration::from_millis(100), policy);
        assert!((e.latency_ms() - 100.0).abs() < 1e-6);

        e.record_result(true, Duration::from_millis(200), policy);
        assert!((e.latency_ms() - 130.0).abs() < 1e-6);
    }

    #[test]
    fn failures_lower_success_rate_and_raise_score() {
        let e = endpoint("127.0.0.1:8080");
        let _g = guard(&e);
        let healthy_score = e.load_score();
        assert!((healthy_score - 0.5).abs() < 1e-9);

        e.record_result(false, Duration::from_millis(1), PassivePolicy::default());
        assert!(e.load_score() > healthy_score);
    }

    #[test]
    fn probe_recovery_after_fast_fail_needs_fresh_successes() {
        let e = endpoint("127.0.0.1:8080");
        let thresholds = HealthThresholds::default();
        let ms = Duration::from_millis(1);

        // Builds a success streak while healthy.
        e.record_probe(true, thresholds);
        e.record_probe(true, thresholds);

        for _ in 0..3 {
            e.record_result(false, ms, PassivePolicy::default());
        }
        assert!(!e.is_healthy());

        assert_eq!(e.record_probe(true, thresholds), None);
        assert_eq!(e.record_probe(true, thresholds), Some(HealthState::Healthy));
        assert_eq!(e.consecutive_failures(), 0);
    }

    #[test]
    fn set_health_reports_changes_only() {
        let e = endpoint("127.0.0.1:8080");
        assert_eq!(e.set_health(true), None);
        assert_eq!(e.set_health(false), Some(HealthState::Unhealthy));
        assert_eq!(e.set_health(false), None);
    }

    #[test]
    fn queue_is_bounded() {
        let e = endpoint("127.0.0.1:8080");
        let t1 = e.try_enqueue(2).unwrap();
        let _t2 = e.try_enqueue(2).unwrap();
        assert!(e.try_enqueue(2).is_none());
        drop(t1);
        assert!(e.try_enqueue(2).is_some());
    }
}
