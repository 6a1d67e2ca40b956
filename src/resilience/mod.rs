//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint selected:
//!     → admission.rs (take an in-flight slot, queue or reject at the cap)
//!     → timeouts.rs (bound the attempt by its deadline)
//!     → On failure: retries.rs (retryable for this method?)
//!     → backoff.rs (wait before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - Only idempotent requests are retried after a timeout
//! - Jittered backoff prevents thundering herd

pub mod admission;
pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use admission::AdmissionControl;
pub use backoff::Backoff;
