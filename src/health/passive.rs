//! Passive health checking (failure detection on live traffic).
//!
//! # Responsibilities
//! - Observe request outcomes
//! - Track consecutive failures
//! - Trigger state transition on threshold breach
//!
//! # Design Decisions
//! - Connection errors, timeouts, malformed responses and upstream
//!   502/503/504 count as failures
//! - Other responses, 4xx included, are successes (client error, not backend)
//! - Live traffic only marks endpoints down; bringing them back is the
//!   monitor's job, unless active checks are disabled

use crate::config::ProxyConfig;

/// Decides fast-fail and recovery from live request outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassivePolicy {
    /// Consecutive live failures that mark an endpoint unhealthy.
    pub failure_threshold: u32,
    /// Whether a live success may restore an unhealthy endpoint.
    pub recover_on_success: bool,
}

impl Default for PassivePolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recover_on_success: false,
        }
    }
}

impl PassivePolicy {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            failure_threshold: config.load_balancing.passive_failure_threshold,
            recover_on_success: !config.health_check.enabled,
        }
    }

    /// Returns the new health flag if this outcome must flip it.
    pub fn evaluate(&self, healthy: bool, success: bool, consecutive_failures: u32) -> Option<bool> {
        match (healthy, success) {
            (true, false) if consecutive_failures >= self.failure_threshold => Some(false),
            (false, true) if self.recover_on_success => Some(true),
            _ => None,
        }
    }
}
