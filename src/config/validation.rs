//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject services that cannot serve traffic (no endpoints, bad addresses)
//! - Validate value ranges (intervals, limits > 0)
//! - Attempt deadlines must exceed the connect timeout
//! - Detect conflicting routes (identical prefixes)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::load_balancer::endpoint::parse_authority;
use crate::routing::matcher::normalize_prefix;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service {0} has no endpoints")]
    NoEndpoints(String),

    #[error("services {first} and {second} share path prefix {prefix}")]
    DuplicatePrefix {
        prefix: String,
        first: String,
        second: String,
    },

    #[error("service {service}: path prefix {prefix:?} must start with '/'")]
    InvalidPrefix { service: String, prefix: String },

    #[error("service {service}: invalid endpoint address {address:?}")]
    InvalidEndpoint { service: String, address: String },

    #[error("service {service}: endpoint {address} is listed more than once")]
    DuplicateEndpoint { service: String, address: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("{field} ({timeout_ms} ms) must exceed timeouts.connect_ms ({connect_ms} ms)")]
    DeadlineBelowConnect {
        field: String,
        timeout_ms: u64,
        connect_ms: u64,
    },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let mut prefixes: HashMap<String, &str> = HashMap::new();
    for (name, service) in &config.services {
        if !service.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix {
                service: name.clone(),
                prefix: service.path_prefix.clone(),
            });
        } else {
            let prefix = normalize_prefix(&service.path_prefix);
            if let Some(first) = prefixes.get(&prefix) {
                errors.push(ValidationError::DuplicatePrefix {
                    prefix,
                    first: first.to_string(),
                    second: name.clone(),
                });
            } else {
                prefixes.insert(prefix, name);
            }
        }

        if service.endpoints.is_empty() {
            errors.push(ValidationError::NoEndpoints(name.clone()));
        }

        let mut seen = HashSet::new();
        for address in &service.endpoints {
            match parse_authority(address) {
                Some(authority) => {
                    if !seen.insert(authority.to_string()) {
                        errors.push(ValidationError::DuplicateEndpoint {
                            service: name.clone(),
                            address: address.clone(),
                        });
                    }
                }
                None => errors.push(ValidationError::InvalidEndpoint {
                    service: name.clone(),
                    address: address.clone(),
                }),
            }
        }

        match service.timeout_ms {
            Some(0) => errors.push(ValidationError::ZeroValue("services.timeout_ms")),
            Some(timeout_ms) if timeout_ms <= config.timeouts.connect_ms => {
                errors.push(ValidationError::DeadlineBelowConnect {
                    field: format!("services.{name}.timeout_ms"),
                    timeout_ms,
                    connect_ms: config.timeouts.connect_ms,
                });
            }
            _ => {}
        }
    }

    // The connect phase runs inside the attempt deadline.
    if config.services.values().any(|s| s.timeout_ms.is_none())
        && config.timeouts.request_ms != 0
        && config.timeouts.request_ms <= config.timeouts.connect_ms
    {
        errors.push(ValidationError::DeadlineBelowConnect {
            field: "timeouts.request_ms".to_string(),
            timeout_ms: config.timeouts.request_ms,
            connect_ms: config.timeouts.connect_ms,
        });
    }

    let zero_checks = [
        (config.timeouts.request_ms == 0, "timeouts.request_ms"),
        (config.timeouts.connect_ms == 0, "timeouts.connect_ms"),
        (config.admission.max_in_flight == 0, "admission.max_in_flight"),
        (
            config.load_balancing.passive_failure_threshold == 0,
            "load_balancing.passive_failure_threshold",
        ),
        (
            config.health_check.enabled && config.health_check.interval_ms == 0,
            "health_check.interval_ms",
        ),
        (
            config.health_check.enabled && config.health_check.timeout_ms == 0,
            "health_check.timeout_ms",
        ),
        (
            config.health_check.unhealthy_threshold == 0,
            "health_check.unhealthy_threshold",
        ),
        (
            config.health_check.healthy_threshold == 0,
            "health_check.healthy_threshold",
        ),
    ];
    errors.extend(
        zero_checks
            .into_iter()
            .filter(|(failed, _)| *failed)
            .map(|(_, field)| ValidationError::ZeroValue(field)),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
