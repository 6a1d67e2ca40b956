//! Least-loaded selection strategy.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::load_balancer::{endpoint::Endpoint, SelectionStrategy};

/// Picks the healthy endpoint with the lowest load score.
///
/// Score is `in_flight / (1 + success_rate)`. Ties go to the lower decayed
/// latency, remaining ties to the first endpoint in cursor order.
#[derive(Debug, Default)]
pub struct LeastLoaded;

impl LeastLoaded {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for LeastLoaded {
    fn next_server(&self, candidates: &[Arc<Endpoint>], cursor: usize) -> Option<Arc<Endpoint>> {
        let len = candidates.len();
        let mut best: Option<(&Arc<Endpoint>, f64, f64)> = None;

        for i in 0..len {
            let endpoint = &candidates[(cursor + i) % len];
            if !endpoint.is_healthy() {
                continue;
            }
            let score = endpoint.load_score();
            let latency = endpoint.latency_ms();
            let better = match best {
                None => true,
                Some((_, best_score, best_latency)) => {
                    match score.total_cmp(&best_score) {
                        Ordering::Less => true,
                        Ordering::Greater => false,
                        Ordering::Equal => latency < best_latency,
                    }
                }
            };
            if better {
                best = Some((endpoint, score, latency));
            }
        }

        best.map(|(endpoint, _, _)| endpoint.clone())
    }
}
