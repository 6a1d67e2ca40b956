//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe every endpoint concurrently
//!     → Fold results into state.rs hysteresis
//!
//! Passive health checks (passive.rs):
//!     Request outcome observed by the forwarding engine
//!     → Consecutive failure count
//!     → Fast-fail once the threshold is reached
//!
//! Aggregate (report.rs):
//!     Per-service healthy counts → healthy / degraded / unhealthy
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - State transitions require consecutive successes/failures
//! - Health state is per-endpoint, not per-service

pub mod active;
pub mod passive;
pub mod report;
pub mod state;

pub use active::HealthMonitor;
pub use report::{GatewayStatus, HealthReport};
