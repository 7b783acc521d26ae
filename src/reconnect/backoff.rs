//! Exponential backoff for reconnect attempts

use std::time::Duration;

use rand::Rng;

use crate::config::ConnectionConfig;

/// Exponential backoff configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first attempt in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential growth
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 3000,
            max_delay_ms: 60_000, // 1 minute
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl From<&ConnectionConfig> for BackoffConfig {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            base_delay_ms: config.reconnect_base_delay_ms,
            max_delay_ms: config.reconnect_max_delay_ms,
            jitter_factor: config.reconnect_jitter_factor,
            ..Self::default()
        }
    }
}

/// Stateless backoff calculator
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

impl ExponentialBackoff {
    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay before attempt `attempt` (1-indexed): `base × multiplier^(attempt-1)`,
    /// capped at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_delay = self.config.base_delay_ms as f64 * self.config.multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.config.max_delay_ms as f64);

        // Apply jitter only if jitter_factor > 0
        let final_delay = if self.config.jitter_factor > 0.0 {
            let jitter_range = capped_delay * self.config.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..jitter_range);
            (capped_delay + jitter).clamp(1.0, self.config.max_delay_ms as f64) as u64
        } else {
            capped_delay.max(1.0) as u64
        };

        Duration::from_millis(final_delay)
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::with_config(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(base: u64, max: u64) -> ExponentialBackoff {
        ExponentialBackoff::with_config(BackoffConfig {
            base_delay_ms: base,
            max_delay_ms: max,
            multiplier: 2.0,
            jitter_factor: 0.0, // No jitter for predictable testing
        })
    }

    #[test]
    fn test_delays_double() {
        let backoff = backoff(1000, 60_000);
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_millis(16_000));
    }

    #[test]
    fn test_default_matches_connection_defaults() {
        let backoff = ExponentialBackoff::default();
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(3000));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_millis(48_000));
    }

    #[test]
    fn test_caps_at_max() {
        let backoff = backoff(3000, 60_000);
        assert_eq!(backoff.delay_for_attempt(6), Duration::from_millis(60_000));
        assert_eq!(backoff.delay_for_attempt(400), Duration::from_millis(60_000));
    }

    #[test]
    fn test_jitter_taken_from_connection_config() {
        let config = ConnectionConfig {
            reconnect_base_delay_ms: 1000,
            reconnect_jitter_factor: 0.5,
            ..ConnectionConfig::new("ws://localhost")
        };
        let backoff = ExponentialBackoff::with_config(BackoffConfig::from(&config));
        assert_eq!(backoff.config().jitter_factor, 0.5);
        for _ in 0..50 {
            let delay = backoff.delay_for_attempt(1).as_millis();
            assert!((500..=1500).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let backoff = ExponentialBackoff::with_config(BackoffConfig {
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        });
        for _ in 0..50 {
            let delay = backoff.delay_for_attempt(2).as_millis();
            assert!((1800..=2200).contains(&delay), "delay {} out of range", delay);
        }
    }
}
