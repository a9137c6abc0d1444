//! Cache-first price retrieval.
//!
//! Per request: look in the cache, and only on a miss ask the provider, then
//! keep what it returned. Queries arrive already validated (`Query` can only
//! be built through `Query::new`), so routing starts at the cache check.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sharelab_core::data::{Coverage, PriceCache, PriceProvider};
use sharelab_core::domain::{PriceRecord, Query};
use sharelab_core::indicators::moving_average;
use tracing::{debug, info, warn};

use crate::config::{CacheHitPolicy, ServiceConfig};
use crate::error::ServiceError;
use crate::fetch::fetch_with_deadline;
use crate::retry::RetryPolicy;

/// Where the records of a [`Retrieval`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Served from the cache; the provider was not consulted.
    Cache,
    /// Fetched from the provider and stored in the cache.
    Provider,
    /// Cache has gaps and the provider was unavailable; the cached subset is returned.
    CachePartial,
}

impl PriceSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Provider => "provider",
            Self::CachePartial => "cache (partial)",
        }
    }
}

/// Records answering one query, with their origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub records: Vec<PriceRecord>,
    pub source: PriceSource,
}

/// Symbol → records, kept in insertion order.
///
/// Inserting a symbol that is already present replaces its records but keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    entries: Vec<(String, Vec<PriceRecord>)>,
}

impl Comparison {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, records: Vec<PriceRecord>) {
        let symbol = symbol.into();
        match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
            Some((_, existing)) => *existing = records,
            None => self.entries.push((symbol, records)),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&[PriceRecord]> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, records)| records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PriceRecord])> {
        self.entries
            .iter()
            .map(|(symbol, records)| (symbol.as_str(), records.as_slice()))
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Retrieval orchestrator over a shared cache and a provider.
pub struct PriceService {
    cache: Arc<PriceCache>,
    provider: Arc<dyn PriceProvider>,
    retry: RetryPolicy,
    fetch_timeout: Option<Duration>,
    hit_policy: CacheHitPolicy,
}

impl std::fmt::Debug for PriceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceService")
            .field("provider", &self.provider.name())
            .field("cached_symbols", &self.cache.len())
            .field("retry", &self.retry)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("hit_policy", &self.hit_policy)
            .finish()
    }
}

impl PriceService {
    /// Plain cache-first service: no deadline, no retries, presence-based hits.
    pub fn new(cache: Arc<PriceCache>, provider: Arc<dyn PriceProvider>) -> Self {
        Self {
            cache,
            provider,
            retry: RetryPolicy::none(),
            fetch_timeout: None,
            hit_policy: CacheHitPolicy::Presence,
        }
    }

    pub fn with_config(
        cache: Arc<PriceCache>,
        provider: Arc<dyn PriceProvider>,
        config: &ServiceConfig,
    ) -> Self {
        Self::new(cache, provider)
            .with_retry_policy(RetryPolicy::from_config(&config.retry))
            .with_fetch_timeout(config.fetch_timeout())
            .with_cache_hit_policy(config.service.cache_hit_policy)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_cache_hit_policy(mut self, policy: CacheHitPolicy) -> Self {
        self.hit_policy = policy;
        self
    }

    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Records for `query`, from the cache when it has any, else from the provider.
    pub fn get_prices(&self, query: &Query) -> Result<Vec<PriceRecord>, ServiceError> {
        self.retrieve(query).map(|r| r.records)
    }

    /// Like [`PriceService::get_prices`] with a per-call fetch deadline.
    /// `None` keeps the configured deadline.
    pub fn get_prices_with_timeout(
        &self,
        query: &Query,
        timeout: Option<Duration>,
    ) -> Result<Vec<PriceRecord>, ServiceError> {
        self.retrieve_within(query, timeout.or(self.fetch_timeout))
            .map(|r| r.records)
    }

    /// Records for `query` together with where they came from.
    pub fn retrieve(&self, query: &Query) -> Result<Retrieval, ServiceError> {
        self.retrieve_within(query, self.fetch_timeout)
    }

    fn retrieve_within(
        &self,
        query: &Query,
        deadline: Option<Duration>,
    ) -> Result<Retrieval, ServiceError> {
        let partial = match self.hit_policy {
            CacheHitPolicy::Presence => {
                if self.cache.has_cached_data(query) {
                    return Ok(self.cache_hit(query));
                }
                false
            }
            CacheHitPolicy::Complete => match self.cache.coverage(query) {
                Coverage::Full => return Ok(self.cache_hit(query)),
                Coverage::NotCached => false,
                Coverage::Partial { missing } => {
                    debug!(%query, missing = missing.len(), "cache has gaps");
                    true
                }
            },
        };

        if !self.provider.is_available() {
            if partial {
                warn!(
                    %query,
                    provider = self.provider.name(),
                    "provider unavailable, returning partial cached data"
                );
                return Ok(Retrieval {
                    records: self.cache.load(query),
                    source: PriceSource::CachePartial,
                });
            }
            warn!(%query, provider = self.provider.name(), "cache miss and provider unavailable");
            return Err(ServiceError::Unreachable {
                query: query.clone(),
                provider: self.provider.name().to_string(),
            });
        }

        info!(%query, provider = self.provider.name(), "cache miss, fetching");
        let started = Instant::now();
        let records = self
            .retry
            .run(|_| fetch_with_deadline(&self.provider, query, deadline))
            .map_err(|source| {
                warn!(%query, error = %source, "fetch failed");
                ServiceError::FetchFailed {
                    query: query.clone(),
                    source,
                }
            })?;

        let added = self.cache.store(&records);
        info!(
            %query,
            records = records.len(),
            added,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched and cached"
        );

        Ok(Retrieval {
            records,
            source: PriceSource::Provider,
        })
    }

    fn cache_hit(&self, query: &Query) -> Retrieval {
        let records = self.cache.load(query);
        debug!(%query, records = records.len(), "cache hit");
        Retrieval {
            records,
            source: PriceSource::Cache,
        }
    }

    /// Retrieve `a` then `b`. A failure on `a` stops before `b` is touched.
    pub fn compare_prices(&self, a: &Query, b: &Query) -> Result<Comparison, ServiceError> {
        let mut comparison = Comparison::new();
        comparison.insert(a.symbol(), self.get_prices(a)?);
        comparison.insert(b.symbol(), self.get_prices(b)?);
        Ok(comparison)
    }

    /// Trailing mean close per record, with shorter windows at the start.
    ///
    /// Panics if `window_days` is zero.
    pub fn calculate_moving_average(&self, records: &[PriceRecord], window_days: usize) -> Vec<f64> {
        moving_average(records, window_days)
    }

    /// Drop cached records older than `days` days. Returns how many were removed.
    pub fn evict_older_than(&self, days: u32) -> usize {
        self.cache.evict_older_than(days)
    }
}
