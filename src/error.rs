//! Per-request error taxonomy.
//!
//! # Responsibilities
//! - Name every way a proxied request can fail
//! - Map each failure to exactly one HTTP status for the caller
//! - Classify which failures may be retried on another endpoint
//!
//! # Design Decisions
//! - Components return `Result<_, GatewayError>`; translation to a response
//!   happens once, at the gateway boundary
//! - Configuration errors live in `config::loader` and never reach requests

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors surfaced while handling a single proxied request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No configured prefix matches the request path.
    #[error("no route matches path {0}")]
    RouteNotFound(String),

    /// The load balancer had nothing to offer (strict mode, or unknown service).
    #[error("no endpoint available for service {0}")]
    NoEndpointAvailable(String),

    /// The chosen endpoint is at its in-flight cap and the queue is full or timed out.
    #[error("endpoint {endpoint} is at capacity")]
    Overloaded { endpoint: String },

    /// Connection refused, reset before the request was written, or connect timeout.
    #[error("failed to connect to upstream {endpoint}: {reason}")]
    UpstreamConnectFailure { endpoint: String, reason: String },

    /// The attempt deadline elapsed before the response head arrived.
    #[error("upstream {endpoint} did not respond within {timeout:?}")]
    UpstreamTimeout { endpoint: String, timeout: Duration },

    /// The upstream answered with something that is not a valid HTTP response.
    #[error("malformed response from upstream {endpoint}: {reason}")]
    UpstreamProtocolError { endpoint: String, reason: String },

    /// Informational: the request body was too large to keep for replay.
    #[error("request body exceeds {limit} bytes, retries disabled")]
    BodyTooLargeForRetry { limit: usize },

    /// Reading the caller's body failed.
    #[error("failed to read request body: {0}")]
    ClientBody(String),

    /// The gateway could not build the upstream request.
    #[error("internal gateway error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status returned to the caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::NoEndpointAvailable(_)
            | GatewayError::Overloaded { .. }
            | GatewayError::UpstreamConnectFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamProtocolError { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::BodyTooLargeForRetry { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::ClientBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound(_) => "route_not_found",
            GatewayError::NoEndpointAvailable(_) => "no_endpoint",
            GatewayError::Overloaded { .. } => "overloaded",
            GatewayError::UpstreamConnectFailure { .. } => "connect_failure",
            GatewayError::UpstreamTimeout { .. } => "timeout",
            GatewayError::UpstreamProtocolError { .. } => "protocol_error",
            GatewayError::BodyTooLargeForRetry { .. } => "body_too_large",
            GatewayError::ClientBody(_) => "client_body",
            GatewayError::Internal(_) => "internal",
        }
    }

    /// Caller-facing reason, in the spirit of `{"detail": "Gateway Timeout"}`.
    fn detail(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound(_) => "Service not found",
            GatewayError::NoEndpointAvailable(_) | GatewayError::UpstreamConnectFailure { .. } => {
                "Service Unavailable"
            }
            GatewayError::Overloaded { .. } => "Service Overloaded",
            GatewayError::UpstreamTimeout { .. } => "Gateway Timeout",
            GatewayError::UpstreamProtocolError { .. } => "Bad Gateway",
            GatewayError::BodyTooLargeForRetry { .. } => "Payload Too Large",
            GatewayError::ClientBody(_) => "Bad Request",
            GatewayError::Internal(_) => "Internal Server Error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.detail() });
        (self.status_code(), Json(body)).into_response()
    }
}
