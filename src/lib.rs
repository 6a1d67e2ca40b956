//! HTTP reverse proxy / API gateway.
//!
//! Requests are matched by longest path prefix to a named service, sent to
//! one of its endpoints chosen by health and load, retried where safe, and
//! streamed back.

// Core subsystems
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod routing;

// Traffic management
pub mod forwarding;
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ProxyConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
