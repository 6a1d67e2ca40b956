//! Round-robin selection strategy.

use std::sync::Arc;

use crate::load_balancer::{endpoint::Endpoint, SelectionStrategy};

/// Rotates through healthy endpoints, starting at the service cursor.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for RoundRobin {
    fn next_server(&self, candidates: &[Arc<Endpoint>], cursor: usize) -> Option<Arc<Endpoint>> {
        let len = candidates.len();
        // Walk at most once around, so an all-unhealthy list ends the loop.
        (0..len)
            .map(|i| &candidates[(cursor + i) % len])
            .find(|endpoint| endpoint.is_healthy())
            .cloned()
    }
}
