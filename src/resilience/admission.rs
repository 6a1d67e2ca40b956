//! Per-endpoint admission control.
//!
//! # Responsibilities
//! - Cap concurrent requests per endpoint
//! - Queue excess requests (bounded depth, bounded wait) or reject them
//!
//! # Design Decisions
//! - The slot is a semaphore permit owned by the `InFlightGuard`, so every
//!   exit path frees it
//! - A rejection is `Overloaded`, which the engine may retry elsewhere

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::TryAcquireError;

use crate::config::{AdmissionConfig, AdmissionMode};
use crate::error::GatewayError;
use crate::load_balancer::{Endpoint, InFlightGuard};

#[derive(Debug, Clone)]
pub struct AdmissionControl {
    mode: AdmissionMode,
    queue_depth: usize,
    queue_timeout: Duration,
}

impl AdmissionControl {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            mode: config.mode,
            queue_depth: config.queue_depth,
            queue_timeout: Duration::from_millis(config.queue_timeout_ms),
        }
    }

    /// Take an in-flight slot on `endpoint`.
    pub async fn admit(&self, endpoint: &Arc<Endpoint>) -> Result<InFlightGuard, GatewayError> {
        let slots = endpoint.slots();
        match slots.clone().try_acquire_owned() {
            Ok(permit) => return Ok(InFlightGuard::new(endpoint.clone(), permit)),
            Err(TryAcquireError::Closed) => return Err(overloaded(endpoint)),
            Err(TryAcquireError::NoPermits) => {}
        }

        if self.mode == AdmissionMode::Reject {
            return Err(overloaded(endpoint));
        }

        let _ticket = endpoint
            .try_enqueue(self.queue_depth)
            .ok_or_else(|| overloaded(endpoint))?;
        tracing::debug!(
            service = endpoint.service(),
            endpoint = endpoint.address(),
            queued = endpoint.queued(),
            "Waiting for admission slot"
        );

        match tokio::time::timeout(self.queue_timeout, slots.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(InFlightGuard::new(endpoint.clone(), permit)),
            _ => Err(overloaded(endpoint)),
        }
    }
}

fn overloaded(endpoint: &Endpoint) -> GatewayError {
    GatewayError::Overloaded {
        endpoint: endpoint.address().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::endpoint::parse_authority;

    fn endpoint(cap: usize) -> Arc<Endpoint> {
        Arc::new(Endpoint::new("svc", parse_authority("127.0.0.1:9000").unwrap(), cap))
    }

    fn control(mode: AdmissionMode, depth: usize, wait_ms: u64) -> AdmissionControl {
        AdmissionControl::new(&AdmissionConfig {
            max_in_flight: 1,
            mode,
            queue_depth: depth,
            queue_timeout_ms: wait_ms,
        })
    }

    #[tokio::test]
    async fn reject_mode_fails_fast_at_cap() {
        let ep = endpoint(1);
        let control = control(AdmissionMode::Reject, 10, 1000);
        let held = control.admit(&ep).await.unwrap();
        assert_eq!(ep.in_flight(), 1);

        assert!(matches!(control.admit(&ep).await, Err(GatewayError::Overloaded { .. })));
        drop(held);
        assert_eq!(ep.in_flight(), 0);
        assert!(control.admit(&ep).await.is_ok());
    }

    #[tokio::test]
    async fn queued_request_gets_released_slot() {
        let ep = endpoint(1);
        let control = control(AdmissionMode::Queue, 1, 1000);
        let held = control.admit(&ep).await.unwrap();

        let waiter = {
            let ep = ep.clone();
            let control = control.clone();
            tokio::spawn(async move { control.admit(&ep).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ep.queued(), 1);

        drop(held);
        assert!(waiter.await.unwrap().is_ok());
        assert_eq!(ep.queued(), 0);
        assert_eq!(ep.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_wait_is_bounded() {
        let ep = endpoint(1);
        let control = control(AdmissionMode::Queue, 1, 100);
        let _held = control.admit(&ep).await.unwrap();

        assert!(matches!(control.admit(&ep).await, Err(GatewayError::Overloaded { .. })));
        assert_eq!(ep.queued(), 0);
    }

    #[tokio::test]
    async fn full_queue_rejects() {
        let ep = endpoint(1);
        let control = control(AdmissionMode::Queue, 0, 1000);
        let _held = control.admit(&ep).await.unwrap();
        assert!(matches!(control.admit(&ep).await, Err(GatewayError::Overloaded { .. })));
    }
}
