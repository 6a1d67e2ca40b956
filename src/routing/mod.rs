//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → router.rs (longest-prefix lookup)
//!     → matcher.rs (segment-boundary match + prefix strip)
//!     → Return: ResolvedRoute { service, path_and_query } or RouteNotFound
//!
//! Route Compilation (at startup):
//!     services config
//!     → Normalize prefixes
//!     → Sort longest first, reject duplicates
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{ResolvedRoute, Route, RouteTable};
