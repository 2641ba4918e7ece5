//! Reconnect backoff.

use serde::Deserialize;
use std::time::Duration;

/// Capped exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Upper bound of the random jitter added to each delay.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_jitter_ms() -> u64 {
    1000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl BackoffConfig {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.capped_delay_ms(attempt) + rand_jitter(self.jitter_ms))
    }

    /// `base * 2^(attempt-1)` capped at `max`, without jitter.
    pub fn capped_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(10);
        self.base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms)
    }
}

/// Random jitter in `0..=max_ms`.
fn rand_jitter(max_ms: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if max_ms == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % (max_ms + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth_and_cap() {
        let backoff = BackoffConfig {
            base_delay_ms: 1000,
            max_delay_ms: 10000,
            jitter_ms: 0,
        };
        assert_eq!(backoff.capped_delay_ms(1), 1000);
        assert_eq!(backoff.capped_delay_ms(2), 2000);
        assert_eq!(backoff.capped_delay_ms(3), 4000);
        assert_eq!(backoff.capped_delay_ms(4), 8000);
        assert_eq!(backoff.capped_delay_ms(5), 10000);
        assert_eq!(backoff.capped_delay_ms(40), 10000);
        assert_eq!(backoff.delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_jitter_bounded() {
        let backoff = BackoffConfig {
            base_delay_ms: 100,
            max_delay_ms: 100,
            jitter_ms: 50,
        };
        for attempt in 1..20 {
            let delay = backoff.delay(attempt).as_millis() as u64;
            assert!((100..=150).contains(&delay), "delay={delay}");
        }
    }

    #[test]
    fn test_attempt_zero_uses_base() {
        let backoff = BackoffConfig {
            jitter_ms: 0,
            ..BackoffConfig::default()
        };
        assert_eq!(backoff.capped_delay_ms(0), backoff.base_delay_ms);
    }
}
