//! Price sources and the in-memory cache

pub mod cache;
pub mod circuit_breaker;
pub mod provider;
pub mod synthetic;

pub use cache::{Coverage, PriceCache, SymbolSummary};
pub use circuit_breaker::{BreakerState, CircuitBreaker, GuardedProvider};
pub use provider::{OfflineProvider, PriceProvider, ProviderError};
pub use synthetic::SyntheticProvider;
