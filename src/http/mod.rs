//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, built-in endpoints, middleware)
//!     → request.rs (request ID, request span)
//!     → [gateway: route → balance → forward]
//!     → headers.rs (hop-by-hop removal, both directions)
//!     → response.rs (streamed relay, in-flight guard in the body)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
