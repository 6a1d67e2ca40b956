//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound one upstream attempt by its deadline
//! - Turn an elapsed deadline into `UpstreamTimeout`
//!
//! Cancellation is independent: dropping the returned future drops the
//! wrapped one.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::GatewayError;

/// Run `fut` until `deadline`.
///
/// `budget` is only used to describe the timeout in the error.
pub async fn until_deadline<T, F>(
    endpoint: &str,
    deadline: Instant,
    budget: Duration,
    fut: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::UpstreamTimeout {
            endpoint: endpoint.to_string(),
            timeout: budget,
        }),
    }
}
