//! Endpoint health state machine.
//!
//! # States
//! - Healthy: endpoint receives traffic
//! - Unhealthy: endpoint excluded from load balancing (unless degraded fallback kicks in)
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive probe failures >= unhealthy_threshold
//!                      or consecutive live failures >= passive threshold
//! Unhealthy → Healthy: consecutive probe successes >= healthy_threshold
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Every transition is returned to the caller so it can be logged once
//! - One probe observation yields at most one transition

use std::fmt;
use std::sync::Arc;

use crate::config::HealthCheckConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn from_healthy(healthy: bool) -> Self {
        if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// Active health probe hysteresis.
    Probe,
    /// Consecutive failures (or a recovery) observed on live traffic.
    LiveTraffic,
    /// Direct `mark_health` call.
    Manual,
}

impl TransitionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionCause::Probe => "probe",
            TransitionCause::LiveTraffic => "live_traffic",
            TransitionCause::Manual => "manual",
        }
    }
}

/// A health flip of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthTransition {
    pub service: Arc<str>,
    pub endpoint: String,
    pub from: HealthState,
    pub to: HealthState,
    pub cause: TransitionCause,
}

/// Probe thresholds for the hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    pub unhealthy: u32,
    pub healthy: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            unhealthy: 2,
            healthy: 2,
        }
    }
}

impl From<&HealthCheckConfig> for HealthThresholds {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            unhealthy: config.unhealthy_threshold,
            healthy: config.healthy_threshold,
        }
    }
}

/// Consecutive probe results for one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeStreak {
    successes: u32,
    failures: u32,
}

impl ProbeStreak {
    /// Fold in one probe result. Returns the new health flag if it must flip.
    pub fn observe(&mut self, ok: bool, healthy: bool, thresholds: HealthThresholds) -> Option<bool> {
        if ok {
            self.failures = 0;
            self.successes = self.successes.saturating_add(1);
            if !healthy && self.successes >= thresholds.healthy {
                return Some(true);
            }
        } else {
            self.successes = 0;
            self.failures = self.failures.saturating_add(1);
            if healthy && self.failures >= thresholds.unhealthy {
                return Some(false);
            }
        }
        None
    }

    /// Forget the streak, so the next flip needs fresh confirmations.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
