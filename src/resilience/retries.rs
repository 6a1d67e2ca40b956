//! Retry classification.
//!
//! # Responsibilities
//! - Decide whether a failed attempt may be repeated on another endpoint
//!
//! # Design Decisions
//! - Connect failures and admission rejections are retryable for every
//!   method: the request never reached a backend
//! - Timeouts are retryable only for GET, HEAD and OPTIONS
//! - Malformed responses are never retried

use axum::http::Method;

use crate::error::GatewayError;

/// Methods that may be replayed after the backend has possibly seen them.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Whether an attempt that failed with `error` may be retried.
pub fn is_retryable(error: &GatewayError, method: &Method) -> bool {
    match error {
        GatewayError::UpstreamConnectFailure { .. } | GatewayError::Overloaded { .. } => true,
        GatewayError::UpstreamTimeout { .. } => is_idempotent(method),
        _ => false,
    }
}
