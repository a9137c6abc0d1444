//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over external price sources (synthetic
//! feed, offline stub, anything wrapped in a circuit breaker) so the service
//! can swap implementations and tests can substitute doubles.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{PriceRecord, Query};

/// Failure of an external source to answer a query.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider did not answer within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("transport failure: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("provider blocked: circuit breaker open (retry in {}s)", .0.as_secs())]
    CircuitOpen(Duration),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Transport failure without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Transport failure wrapping a lower-level error.
    pub fn transport_caused_by(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Whether repeating the same fetch could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport { .. })
    }
}

/// Trait for external price sources.
///
/// Providers know nothing about the cache; the service sits above this trait
/// and decides when a fetch is needed.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily records for `query`, ascending by date.
    ///
    /// The result may have gaps (weekends, holidays) and is not guaranteed to
    /// be complete or deduplicated.
    fn fetch_prices(&self, query: &Query) -> Result<Vec<PriceRecord>, ProviderError>;

    /// Cheap reachability check. Never fails; reports `false` instead.
    fn is_available(&self) -> bool;

    /// Called when a caller gave up waiting on [`PriceProvider::fetch_prices`].
    fn record_timeout(&self, _waited: Duration) {}
}

/// Provider that is never reachable. Used for `--offline` runs, where only
/// cached data can answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineProvider;

impl PriceProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    fn fetch_prices(&self, query: &Query) -> Result<Vec<PriceRecord>, ProviderError> {
        Err(ProviderError::Unavailable(format!(
            "offline mode, cannot fetch {query}"
        )))
    }

    fn is_available(&self) -> bool {
        false
    }
}
