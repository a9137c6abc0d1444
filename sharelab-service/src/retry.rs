//! Bounded retry with exponential backoff for provider fetches.

use std::time::Duration;

use sharelab_core::data::ProviderError;
use tracing::warn;

use crate::config::RetryConfig;

/// How often, and how patiently, a failed fetch is repeated.
///
/// Only errors with [`ProviderError::is_retryable`] are repeated. The default
/// policy never retries, so a failing provider is called exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retries are used up. `op` receives the 0-based attempt number.
    pub fn run<T>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                std::thread::sleep(self.delay_for(attempt));
            }
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = self.delay_for(attempt).as_millis() as u64,
                        error = %err,
                        "provider fetch failed, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn default_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy, RetryPolicy::none());

        let mut calls = 0;
        let result: Result<(), _> = policy.run(|_| {
            calls += 1;
            Err(ProviderError::transport("reset"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_millis(1_000),
        };
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(64), Duration::from_millis(1_000));
    }

    #[test]
    fn retries_until_success() {
        let mut calls = 0;
        let result = fast(3).run(|attempt| {
            calls += 1;
            if attempt < 2 {
                Err(ProviderError::Timeout(Duration::from_millis(5)))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<(), _> = fast(2).run(|_| {
            calls += 1;
            Err(ProviderError::transport("reset"))
        });
        assert!(matches!(result, Err(ProviderError::Transport { .. })));
        assert_eq!(calls, 3);
    }

    #[test]
    fn non_retryable_error_stops_immediately() {
        let mut calls = 0;
        let result: Result<(), _> = fast(5).run(|_| {
            calls += 1;
            Err(ProviderError::SymbolNotFound {
                symbol: "ZZZZ".into(),
            })
        });
        assert!(matches!(result, Err(ProviderError::SymbolNotFound { .. })));
        assert_eq!(calls, 1);
    }
}
