//! Degraded fallback used when no candidate is healthy.

use std::sync::Arc;

use crate::load_balancer::endpoint::Endpoint;

/// Candidate with the fewest consecutive failures; ties go to the one that
/// failed least recently, and endpoints that never failed come first.
pub fn fewest_failures(candidates: &[Arc<Endpoint>]) -> Option<Arc<Endpoint>> {
    candidates
        .iter()
        .min_by_key(|endpoint| endpoint.failure_rank())
        .cloned()
}
