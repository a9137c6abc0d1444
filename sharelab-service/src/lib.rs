//! ShareLab Service: cache-first retrieval on top of `sharelab-core`.
//!
//! - `PriceService`: cache lookup, provider fallback, store-then-return
//! - Multi-symbol comparison and moving average pass-through
//! - Optional fetch deadline and bounded retry with backoff
//! - TOML configuration for the service and the binary's wiring

pub mod config;
pub mod error;
mod fetch;
pub mod retry;
pub mod service;

pub use config::{
    CacheConfig, CacheHitPolicy, ConfigError, FetchConfig, ProviderConfig, ProviderKind,
    RetryConfig, ServiceConfig,
};
pub use error::ServiceError;
pub use retry::RetryPolicy;
pub use service::{Comparison, PriceService, PriceSource, Retrieval};
