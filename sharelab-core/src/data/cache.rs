//! In-memory price cache.
//!
//! Layout: symbol → history, where each history is a `Vec<PriceRecord>`
//! strictly ascending by date behind its own `RwLock`.
//!
//! Features:
//! - Insert-if-absent merge (an already cached date is never overwritten)
//! - Inclusive range loads via binary search on the sorted history
//! - Age-based eviction across all symbols
//! - Coverage report listing weekdays missing from a cached range
//!
//! The symbol table is a `DashMap`, used only to hand out the per-symbol
//! history handle; the merge, load and eviction work happens under that
//! symbol's lock alone, so different symbols never wait on each other.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{PriceRecord, Query};

type History = Arc<RwLock<Vec<PriceRecord>>>;

fn read(history: &RwLock<Vec<PriceRecord>>) -> RwLockReadGuard<'_, Vec<PriceRecord>> {
    history.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(history: &RwLock<Vec<PriceRecord>>) -> RwLockWriteGuard<'_, Vec<PriceRecord>> {
    history.write().unwrap_or_else(PoisonError::into_inner)
}

/// Index range of `history` whose dates fall inside `query`.
fn range_bounds(history: &[PriceRecord], query: &Query) -> (usize, usize) {
    let start = history.partition_point(|r| r.date() < query.from());
    let end = history.partition_point(|r| r.date() <= query.to());
    (start, end.max(start))
}

/// How well the cache covers the weekdays of a query range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    /// No cached record falls inside the range.
    NotCached,
    /// Every weekday of the range has a cached record.
    Full,
    /// Some records are cached; `missing` lists the absent weekdays, ascending.
    Partial { missing: Vec<NaiveDate> },
}

/// Per-symbol cache summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub records: usize,
    pub first: NaiveDate,
    pub last: NaiveDate,
}

/// Thread-safe in-memory store of price history keyed by symbol.
#[derive(Debug, Default)]
pub struct PriceCache {
    series: DashMap<String, History>,
}

impl PriceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, symbol: &str) -> Option<History> {
        self.series.get(symbol).map(|entry| Arc::clone(entry.value()))
    }

    fn history_for(&self, symbol: &str) -> History {
        if let Some(history) = self.existing(symbol) {
            return history;
        }
        Arc::clone(&self.series.entry(symbol.to_string()).or_default())
    }

    /// Merge a single-symbol batch into the cache.
    ///
    /// Dates already present are left untouched (first write wins), so storing
    /// the same or overlapping batches repeatedly is idempotent. The symbol of
    /// the first record names the batch; records for any other symbol are
    /// skipped. Returns the number of records added.
    pub fn store(&self, records: &[PriceRecord]) -> usize {
        let Some(first) = records.first() else {
            return 0;
        };
        let symbol = first.symbol();
        let history = self.history_for(symbol);
        let mut history = write(&history);

        let mut added = 0;
        let mut skipped = 0;
        for record in records {
            if record.symbol() != symbol {
                warn!(
                    batch_symbol = symbol,
                    record_symbol = record.symbol(),
                    date = %record.date(),
                    "ignoring record for a different symbol in single-symbol batch"
                );
                skipped += 1;
                continue;
            }
            match history.binary_search_by_key(&record.date(), |r| r.date()) {
                Ok(_) => skipped += 1,
                Err(pos) => {
                    history.insert(pos, record.clone());
                    added += 1;
                }
            }
        }

        debug!(symbol, added, skipped, total = history.len(), "stored price records");
        added
    }

    /// Cached records for the query's symbol within `[from, to]`, ascending.
    ///
    /// Unknown symbols and empty ranges yield an empty vector.
    pub fn load(&self, query: &Query) -> Vec<PriceRecord> {
        let Some(history) = self.existing(query.symbol()) else {
            return Vec::new();
        };
        let history = read(&history);
        let (start, end) = range_bounds(&history, query);
        history[start..end].to_vec()
    }

    /// Whether at least one cached record falls inside the query range.
    ///
    /// This is a presence check: a single cached day satisfies it even when
    /// the rest of the range is missing. Use [`PriceCache::coverage`] for gaps.
    pub fn has_cached_data(&self, query: &Query) -> bool {
        let Some(history) = self.existing(query.symbol()) else {
            return false;
        };
        let history = read(&history);
        let (start, end) = range_bounds(&history, query);
        end > start
    }

    /// Report which weekdays of the query range are cached.
    ///
    /// Exchange holidays are unknown to the cache and count as missing.
    pub fn coverage(&self, query: &Query) -> Coverage {
        let cached = self.load(query);
        if cached.is_empty() {
            return Coverage::NotCached;
        }

        let mut missing = Vec::new();
        let mut cached_dates = cached.iter().map(|r| r.date()).peekable();
        let mut day = query.from();
        while day <= query.to() {
            while cached_dates.next_if(|d| *d < day).is_some() {}
            let is_weekday = !matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
            if is_weekday && cached_dates.peek() != Some(&day) {
                missing.push(day);
            }
            day += Duration::days(1);
        }

        if missing.is_empty() {
            Coverage::Full
        } else {
            Coverage::Partial { missing }
        }
    }

    /// Remove every record dated before `cutoff`, for all symbols.
    ///
    /// Returns the number of records removed.
    pub fn evict_before(&self, cutoff: NaiveDate) -> usize {
        let histories: Vec<History> = self
            .series
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut removed = 0;
        for history in histories {
            let mut history = write(&history);
            let keep_from = history.partition_point(|r| r.date() < cutoff);
            history.drain(..keep_from);
            removed += keep_from;
        }

        info!(%cutoff, removed, "evicted cached price records");
        removed
    }

    /// Remove every record older than `days` days before today.
    ///
    /// A horizon reaching past the earliest representable date evicts nothing.
    pub fn evict_older_than(&self, days: u32) -> usize {
        let cutoff = Local::now()
            .date_naive()
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        self.evict_before(cutoff)
    }

    /// Symbols with at least one cached record, sorted.
    pub fn symbols(&self) -> Vec<String> {
        self.summary().into_iter().map(|s| s.symbol).collect()
    }

    /// Record count and date span per cached symbol, sorted by symbol.
    pub fn summary(&self) -> Vec<SymbolSummary> {
        let histories: Vec<(String, History)> = self
            .series
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut summaries: Vec<SymbolSummary> = histories
            .into_iter()
            .filter_map(|(symbol, history)| {
                let history = read(&history);
                let first = history.first()?.date();
                let last = history.last()?.date();
                Some(SymbolSummary {
                    symbol,
                    records: history.len(),
                    first,
                    last,
                })
            })
            .collect();
        summaries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        summaries
    }

    /// Number of symbols with at least one cached record.
    pub fn len(&self) -> usize {
        self.summary().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(symbol: &str, date: NaiveDate, close: f64) -> PriceRecord {
        PriceRecord::new(symbol, date, close, close + 1.0, close - 1.0, close, 1_000)
    }

    fn query(symbol: &str, from: NaiveDate, to: NaiveDate) -> Query {
        Query::new(symbol, from, to).unwrap()
    }

    #[test]
    fn empty_store_is_noop() {
        let cache = PriceCache::new();
        assert_eq!(cache.store(&[]), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn load_unknown_symbol_is_empty() {
        let cache = PriceCache::new();
        let q = query("NOPE", d(2024, 1, 1), d(2024, 1, 31));
        assert!(cache.load(&q).is_empty());
        assert!(!cache.has_cached_data(&q));
        assert_eq!(cache.coverage(&q), Coverage::NotCached);
    }

    #[test]
    fn store_sorts_out_of_order_input() {
        let cache = PriceCache::new();
        cache.store(&[
            record("AAPL", d(2024, 1, 4), 3.0),
            record("AAPL", d(2024, 1, 2), 1.0),
            record("AAPL", d(2024, 1, 3), 2.0),
        ]);

        let loaded = cache.load(&query("AAPL", d(2024, 1, 1), d(2024, 1, 31)));
        let dates: Vec<NaiveDate> = loaded.iter().map(|r| r.date()).collect();
        assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);
    }

    #[test]
    fn existing_date_is_not_overwritten() {
        let cache = PriceCache::new();
        cache.store(&[record("AAPL", d(2024, 1, 2), 100.0)]);
        let added = cache.store(&[record("AAPL", d(2024, 1, 2), 999.0)]);

        assert_eq!(added, 0);
        let loaded = cache.load(&query("AAPL", d(2024, 1, 2), d(2024, 1, 2)));
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].close(), 100.0);
    }

    #[test]
    fn duplicate_dates_within_a_batch_keep_the_first() {
        let cache = PriceCache::new();
        let added = cache.store(&[
            record("AAPL", d(2024, 1, 2), 1.0),
            record("AAPL", d(2024, 1, 2), 2.0),
        ]);
        assert_eq!(added, 1);
        let loaded = cache.load(&query("AAPL", d(2024, 1, 2), d(2024, 1, 2)));
        assert_eq!(loaded[0].close(), 1.0);
    }

    #[test]
    fn storing_twice_is_idempotent() {
        let cache = PriceCache::new();
        let batch = vec![
            record("MSFT", d(2024, 1, 2), 1.0),
            record("MSFT", d(2024, 1, 3), 2.0),
        ];
        cache.store(&batch);
        let q = query("MSFT", d(2024, 1, 1), d(2024, 1, 31));
        let once = cache.load(&q);

        assert_eq!(cache.store(&batch), 0);
        assert_eq!(cache.load(&q), once);
    }

    #[test]
    fn overlapping_batches_merge() {
        let cache = PriceCache::new();
        cache.store(&[
            record("MSFT", d(2024, 1, 2), 1.0),
            record("MSFT", d(2024, 1, 3), 2.0),
        ]);
        let added = cache.store(&[
            record("MSFT", d(2024, 1, 3), 20.0),
            record("MSFT", d(2024, 1, 4), 3.0),
        ]);
        assert_eq!(added, 1);

        let loaded = cache.load(&query("MSFT", d(2024, 1, 1), d(2024, 1, 31)));
        let closes: Vec<f64> = loaded.iter().map(|r| r.close()).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn foreign_symbol_records_are_skipped() {
        let cache = PriceCache::new();
        let added = cache.store(&[
            record("AAPL", d(2024, 1, 2), 1.0),
            record("MSFT", d(2024, 1, 3), 2.0),
        ]);
        assert_eq!(added, 1);
        assert_eq!(cache.symbols(), vec!["AAPL".to_string()]);
    }

    #[test]
    fn load_is_inclusive_range() {
        let cache = PriceCache::new();
        cache.store(&[
            record("TSLA", d(2024, 1, 2), 1.0),
            record("TSLA", d(2024, 1, 3), 2.0),
            record("TSLA", d(2024, 1, 4), 3.0),
            record("TSLA", d(2024, 1, 5), 4.0),
        ]);

        let loaded = cache.load(&query("TSLA", d(2024, 1, 3), d(2024, 1, 4)));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].date(), d(2024, 1, 3));
        assert_eq!(loaded[1].date(), d(2024, 1, 4));

        assert!(cache
            .load(&query("TSLA", d(2024, 2, 1), d(2024, 2, 28)))
            .is_empty());
    }

    #[test]
    fn presence_check_accepts_partial_overlap() {
        let cache = PriceCache::new();
        cache.store(&[record("AAPL", d(2024, 1, 31), 1.0)]);
        let q = query("AAPL", d(2024, 1, 1), d(2024, 1, 31));
        assert!(cache.has_cached_data(&q));
        assert!(matches!(cache.coverage(&q), Coverage::Partial { .. }));
    }

    #[test]
    fn coverage_ignores_weekends() {
        let cache = PriceCache::new();
        // Mon 2024-01-08 .. Fri 2024-01-12
        let week: Vec<PriceRecord> = (8..=12)
            .map(|day| record("AAPL", d(2024, 1, day), 1.0))
            .collect();
        cache.store(&week);

        // Range includes the surrounding weekend days.
        let q = query("AAPL", d(2024, 1, 6), d(2024, 1, 14));
        assert_eq!(cache.coverage(&q), Coverage::Full);
    }

    #[test]
    fn coverage_lists_missing_weekdays() {
        let cache = PriceCache::new();
        cache.store(&[
            record("AAPL", d(2024, 1, 8), 1.0),
            record("AAPL", d(2024, 1, 10), 1.0),
        ]);
        let q = query("AAPL", d(2024, 1, 8), d(2024, 1, 12));
        assert_eq!(
            cache.coverage(&q),
            Coverage::Partial {
                missing: vec![d(2024, 1, 9), d(2024, 1, 11), d(2024, 1, 12)]
            }
        );
    }

    #[test]
    fn evict_older_than_keeps_recent_records() {
        let cache = PriceCache::new();
        let today = Local::now().date_naive();
        cache.store(&[
            record("AAPL", today - Duration::days(10), 1.0),
            record("AAPL", today - Duration::days(1), 2.0),
        ]);

        let removed = cache.evict_older_than(5);
        assert_eq!(removed, 1);

        let loaded = cache.load(&query("AAPL", today - Duration::days(30), today));
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].date(), today - Duration::days(1));
    }

    #[test]
    fn evict_older_than_huge_horizon_evicts_nothing() {
        let cache = PriceCache::new();
        cache.store(&[
            record("AAPL", d(1990, 1, 2), 1.0),
            record("AAPL", d(2024, 1, 2), 2.0),
        ]);

        assert_eq!(cache.evict_older_than(u32::MAX), 0);
        assert_eq!(cache.summary()[0].records, 2);
    }

    #[test]
    fn evict_before_applies_to_every_symbol() {
        let cache = PriceCache::new();
        cache.store(&[
            record("AAPL", d(2024, 1, 2), 1.0),
            record("AAPL", d(2024, 3, 1), 1.0),
        ]);
        cache.store(&[record("MSFT", d(2024, 1, 5), 1.0)]);

        assert_eq!(cache.evict_before(d(2024, 2, 1)), 2);
        assert_eq!(cache.symbols(), vec!["AAPL".to_string()]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn summary_reports_span_per_symbol() {
        let cache = PriceCache::new();
        cache.store(&[
            record("MSFT", d(2024, 1, 3), 1.0),
            record("MSFT", d(2024, 1, 2), 1.0),
        ]);
        cache.store(&[record("AAPL", d(2024, 1, 5), 1.0)]);

        let summary = cache.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].symbol, "AAPL");
        assert_eq!(summary[1].records, 2);
        assert_eq!(summary[1].first, d(2024, 1, 2));
        assert_eq!(summary[1].last, d(2024, 1, 3));
    }

    #[test]
    fn concurrent_stores_keep_history_sorted() {
        let cache = Arc::new(PriceCache::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let day = d(2024, 1, 1) + Duration::days((i * 4 + t) % 120);
                        cache.store(&[record("SPY", day, i as f64)]);
                        let symbol = if t % 2 == 0 { "QQQ" } else { "IWM" };
                        cache.store(&[record(symbol, day, i as f64)]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = cache.load(&query("SPY", d(2024, 1, 1), d(2024, 12, 31)));
        assert!(!loaded.is_empty());
        for pair in loaded.windows(2) {
            assert!(pair[0].date() < pair[1].date());
        }
    }
}
