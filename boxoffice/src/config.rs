//! Service configuration.
//!
//! Plain structs with defaults good enough for development; production
//! callers override through the `with_` builders.

use std::time::Duration;

/// Retry behavior for operations that can lose an optimistic-concurrency
/// race and safely run again.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap on the exponential backoff.
    pub max_delay: Duration,
    /// Multiplier applied per retry.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry number `attempt` (1-based), with up to 10%
    /// jitter so synchronized losers spread out.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let scaled = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_millis() as f64);
        let jitter = rand::rng().random_range(0.0..=0.1);
        Duration::from_millis((capped * (1.0 + jitter)) as u64)
    }
}

/// Top-level configuration for [`BoxOffice`](crate::service::BoxOffice).
#[derive(Debug, Clone)]
pub struct BoxOfficeConfig {
    /// Retry policy for concurrency conflicts.
    pub retry: RetryConfig,
    /// Deadline for every individual gateway call.
    pub gateway_timeout: Duration,
}

impl Default for BoxOfficeConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            gateway_timeout: Duration::from_secs(10),
        }
    }
}

impl BoxOfficeConfig {
    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Override the gateway call deadline.
    #[must_use]
    pub const fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_respects_the_cap() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            backoff_multiplier: 2.0,
        };

        let first = config.delay_for(1);
        assert!(first >= Duration::from_millis(100));
        assert!(first <= Duration::from_millis(110));

        let second = config.delay_for(2);
        assert!(second >= Duration::from_millis(200));
        assert!(second <= Duration::from_millis(220));

        // 100 * 2^2 = 400 exceeds the cap
        let third = config.delay_for(3);
        assert!(third <= Duration::from_millis(385));
    }

    #[test]
    fn defaults_are_sane() {
        let config = BoxOfficeConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.gateway_timeout >= Duration::from_secs(1));
    }
}
