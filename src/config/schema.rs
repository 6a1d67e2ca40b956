//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Built-in endpoints served by the gateway itself.
    pub gateway: GatewayConfig,

    /// Backend services keyed by name.
    pub services: BTreeMap<String, ServiceConfig>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Endpoint selection policy.
    pub load_balancing: LoadBalancingConfig,

    /// Per-endpoint admission control.
    pub admission: AdmissionConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream client connection pool.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin listener configuration.
    pub admin: AdminConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let services = [("users", 8001), ("orders", 8002), ("products", 8003)]
            .into_iter()
            .map(|(name, port)| {
                (
                    name.to_string(),
                    ServiceConfig::new(format!("/{}", name), vec![format!("localhost:{}", port)]),
                )
            })
            .collect();

        Self {
            listener: ListenerConfig::default(),
            gateway: GatewayConfig::default(),
            services,
            health_check: HealthCheckConfig::default(),
            load_balancing: LoadBalancingConfig::default(),
            admission: AdmissionConfig::default(),
            retries: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            upstream: UpstreamConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// A configuration with no services, for building one up programmatically.
    pub fn empty() -> Self {
        Self {
            services: BTreeMap::new(),
            ..Self::default()
        }
    }

    /// Per-attempt deadline for a service, falling back to the global default.
    pub fn attempt_timeout(&self, service: &ServiceConfig) -> Duration {
        Duration::from_millis(service.timeout_ms.unwrap_or(self.timeouts.request_ms))
    }

    /// Retry count for a service, falling back to the global default.
    pub fn max_retries(&self, service: &ServiceConfig) -> u32 {
        service.max_retries.unwrap_or(self.retries.max_retries)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Endpoints answered by the gateway rather than proxied.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Path of the aggregate health endpoint.
    pub health_path: String,

    /// Serve the welcome/service list document on `GET /`.
    pub expose_index: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            health_path: "/health".to_string(),
            expose_index: true,
        }
    }
}

/// One backend service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Path prefix routed to this service.
    pub path_prefix: String,

    /// Upstream endpoints as `host:port` (an `http://` scheme is accepted).
    pub endpoints: Vec<String>,

    /// Per-attempt deadline override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Retry count override.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl ServiceConfig {
    pub fn new(path_prefix: impl Into<String>, endpoints: Vec<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            endpoints,
            timeout_ms: None,
            max_retries: None,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Path to probe on each endpoint.
    pub path: String,

    /// Number of consecutive probe failures before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive probe successes before marking healthy.
    pub healthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5_000,
            timeout_ms: 2_000,
            path: "/health".to_string(),
            unhealthy_threshold: 2,
            healthy_threshold: 2,
        }
    }
}

/// Endpoint selection strategy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Lowest `in_flight / (1 + success_rate)`, then latency, then rotation.
    #[default]
    LeastLoaded,
    /// Plain rotation over healthy endpoints.
    RoundRobin,
}

/// What to do when a service has no healthy endpoint.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Pick the endpoint with the fewest consecutive failures.
    #[default]
    Degrade,
    /// Fail with 503.
    Strict,
}

/// Load balancing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadBalancingConfig {
    pub strategy: Strategy,
    pub fallback: FallbackMode,

    /// Consecutive live failures that mark an endpoint unhealthy without waiting for a probe.
    pub passive_failure_threshold: u32,
}

impl Default for LoadBalancingConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::LeastLoaded,
            fallback: FallbackMode::Degrade,
            passive_failure_threshold: 3,
        }
    }
}

/// Behavior when an endpoint is at its in-flight cap.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Wait in a bounded queue for a slot.
    #[default]
    Queue,
    /// Reject immediately with 503.
    Reject,
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum concurrent requests per endpoint.
    pub max_in_flight: usize,

    pub mode: AdmissionMode,

    /// Maximum number of requests waiting for a slot per endpoint.
    pub queue_depth: usize,

    /// Maximum time a request waits in the queue, in milliseconds.
    pub queue_timeout_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 100,
            mode: AdmissionMode::Queue,
            queue_depth: 50,
            queue_timeout_ms: 1_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Default number of retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Largest request body kept in memory for replay.
    pub max_replay_body_bytes: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 50,
            max_delay_ms: 1_000,
            max_replay_body_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Default per-attempt deadline in milliseconds.
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            request_ms: 30_000,
        }
    }
}

/// Upstream HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Idle keep-alive connections kept per endpoint.
    pub pool_max_idle_per_host: usize,

    /// How long an idle connection is kept, in seconds.
    pub pool_idle_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin listener.
    pub enabled: bool,

    /// Admin bind address. Unauthenticated, keep it on loopback.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
