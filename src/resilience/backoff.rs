//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Delay schedule between retries: `base * 2^(retry-1)`, capped, plus up to 10% jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Delay before retry number `retry` (1-based). Retry 0 waits nothing.
    pub fn delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        let exponential = 2u64.saturating_pow(retry - 1);
        let capped = base_ms.saturating_mul(exponential).min(max_ms);

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..=jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(1000));

        let b1 = backoff.delay(1);
        assert!(b1 >= Duration::from_millis(100) && b1 <= Duration::from_millis(110));

        let b2 = backoff.delay(2);
        assert!(b2 >= Duration::from_millis(200) && b2 <= Duration::from_millis(220));

        let max = backoff.delay(10);
        assert!(max >= Duration::from_millis(1000) && max <= Duration::from_millis(1100));
    }

    #[test]
    fn zero_retry_is_immediate() {
        assert_eq!(Backoff::default().delay(0), Duration::ZERO);
    }

    #[test]
    fn huge_retry_count_does_not_overflow() {
        let backoff = Backoff::default();
        assert!(backoff.delay(u32::MAX) <= Duration::from_millis(1100));
    }
}
