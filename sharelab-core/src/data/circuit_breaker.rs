//! Circuit breaker for price providers.
//!
//! After a run of consecutive failures the breaker trips and the wrapped
//! provider reports itself unavailable until the cooldown has elapsed, so the
//! service stops hammering a source that keeps failing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

use super::provider::{PriceProvider, ProviderError};
use crate::domain::{PriceRecord, Query};

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation: requests are allowed.
    Closed,
    /// Tripped: all requests are refused until cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
}

/// Circuit breaker that stops calls to a provider after repeated failures.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    /// Create a breaker that trips after `failure_threshold` consecutive
    /// failures (minimum 1) and stays open for `cooldown`.
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Default breaker: trips after 3 consecutive failures, 30-minute cooldown.
    pub fn default_provider() -> Self {
        Self::new(3, Duration::from_secs(30 * 60))
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if requests are currently allowed.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } => {
                if tripped_at.elapsed() >= self.cooldown {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful request: resets the failure counter.
    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Record a failure; trips the breaker once the threshold is reached.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            warn!(
                failures = inner.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit breaker tripped"
            );
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Immediately trip the breaker.
    pub fn trip(&self) {
        self.lock().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }

    /// Current state snapshot.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Remaining cooldown time (zero if not tripped).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => self.cooldown.saturating_sub(tripped_at.elapsed()),
        }
    }
}

/// Provider decorator that routes every fetch through a [`CircuitBreaker`].
pub struct GuardedProvider<P> {
    inner: P,
    breaker: Arc<CircuitBreaker>,
}

impl<P: PriceProvider> GuardedProvider<P> {
    pub fn new(inner: P, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<P: PriceProvider> PriceProvider for GuardedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch_prices(&self, query: &Query) -> Result<Vec<PriceRecord>, ProviderError> {
        if !self.breaker.is_allowed() {
            return Err(ProviderError::CircuitOpen(self.breaker.remaining_cooldown()));
        }
        match self.inner.fetch_prices(query) {
            Ok(records) => {
                self.breaker.record_success();
                Ok(records)
            }
            Err(err) => {
                self.breaker.record_failure();
                Err(err)
            }
        }
    }

    fn is_available(&self) -> bool {
        self.breaker.is_allowed() && self.inner.is_available()
    }

    /// An abandoned fetch counts as a failure.
    fn record_timeout(&self, waited: Duration) {
        self.breaker.record_failure();
        self.inner.record_timeout(waited);
    }
}
