//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! ResolvedRoute + inbound request
//!     → body.rs (buffer for replay up to the cap, else stream once)
//!     → engine.rs loop:
//!         select endpoint (excluding tried) → admission → attempt.rs
//!         → client.rs (HTTP/1.1, pooled) under the attempt deadline
//!         → classify outcome, mark_result, retry with backoff?
//!     → http::response (streamed relay)
//! ```

pub mod attempt;
pub mod body;
pub mod client;
pub mod engine;

pub use engine::ForwardingEngine;
