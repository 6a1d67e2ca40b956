//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → Gateway::build turns it into RouteTable + BackendPool
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AdmissionConfig, AdmissionMode, FallbackMode, GatewayConfig, HealthCheckConfig,
    ListenerConfig, LoadBalancingConfig, LogFormat, ObservabilityConfig, ProxyConfig,
    RetryConfig, ServiceConfig, Strategy, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
