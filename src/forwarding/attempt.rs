//! One forwarding attempt.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::GatewayError;
use crate::load_balancer::Endpoint;

/// Scoped to a single try against a single endpoint.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub endpoint: Arc<Endpoint>,
    /// 0 for the first try, 1 for the first retry, and so on.
    pub number: u32,
    pub started: Instant,
    pub deadline: Instant,
    pub budget: Duration,
}

impl Attempt {
    pub fn new(endpoint: Arc<Endpoint>, number: u32, budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            endpoint,
            number,
            started,
            deadline: started + budget,
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Classify an upstream client error.
///
/// Failures to establish the connection never reached the backend; anything
/// else (bad status line, connection closed mid-response) is a protocol error.
pub fn classify(endpoint: &str, err: &hyper_util::client::legacy::Error) -> GatewayError {
    let reason = error_chain(err);
    if err.is_connect() {
        GatewayError::UpstreamConnectFailure {
            endpoint: endpoint.to_string(),
            reason,
        }
    } else {
        GatewayError::UpstreamProtocolError {
            endpoint: endpoint.to_string(),
            reason,
        }
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}
