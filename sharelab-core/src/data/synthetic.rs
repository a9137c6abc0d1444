//! Synthetic price feed.
//!
//! Stand-in for a real market-data source: a deterministic random walk per
//! symbol, weekdays only. Two fetches for the same symbol and range return the
//! same records.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::provider::{PriceProvider, ProviderError};
use crate::domain::{PriceRecord, Query};

/// Always-available provider producing deterministic synthetic OHLCV data.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_prices(&self, query: &Query) -> Result<Vec<PriceRecord>, ProviderError> {
        let records = generate_series(query.symbol(), query.from(), query.to());
        debug!(symbol = query.symbol(), records = records.len(), "generated synthetic series");
        Ok(records)
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Generate a weekday-only random walk for `symbol` over `[start, end]`.
///
/// The walk is seeded from the symbol alone and always starts at `start`, so
/// the same (symbol, start) pair reproduces the same prices.
pub fn generate_series(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PriceRecord> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut records = Vec::new();
    let mut price = 100.0 + rng.gen_range(0.0..400.0);
    let mut current = start;

    while current <= end {
        if is_weekend(current) {
            current += Duration::days(1);
            continue;
        }

        // Slight upward bias: change drawn from [-2.4, 2.6).
        let change = (rng.gen::<f64>() - 0.48) * 5.0;
        let open = price;
        let close = (price + change).max(1.0);
        let high = open.max(close) + rng.gen_range(0.0..2.0);
        let low = (open.min(close) - rng.gen_range(0.0..2.0)).max(0.01);
        let volume = rng.gen_range(1_000_000..10_000_000u64);

        records.push(PriceRecord::new(symbol, current, open, high, low, close, volume));

        price = close;
        current += Duration::days(1);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn skips_weekends() {
        // 2024-01-01 is a Monday; two full weeks hold ten weekdays.
        let records = generate_series("AAPL", d(2024, 1, 1), d(2024, 1, 14));
        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| !is_weekend(r.date())));
    }

    #[test]
    fn dates_are_strictly_ascending() {
        let records = generate_series("AAPL", d(2024, 1, 1), d(2024, 3, 31));
        for pair in records.windows(2) {
            assert!(pair[0].date() < pair[1].date());
        }
    }

    #[test]
    fn records_are_sane() {
        let records = generate_series("TSLA", d(2023, 1, 1), d(2024, 12, 31));
        for record in &records {
            assert!(record.is_sane(), "insane record: {record:?}");
            assert!(record.close() >= 1.0);
            assert!((1_000_000..10_000_000).contains(&record.volume()));
        }
    }

    #[test]
    fn deterministic_per_symbol() {
        let a = generate_series("MSFT", d(2024, 1, 1), d(2024, 1, 31));
        let b = generate_series("MSFT", d(2024, 1, 1), d(2024, 1, 31));
        assert_eq!(a, b);
    }

    #[test]
    fn different_symbols_get_different_prices() {
        let msft = generate_series("MSFT", d(2024, 1, 1), d(2024, 1, 31));
        let aapl = generate_series("AAPL", d(2024, 1, 1), d(2024, 1, 31));
        assert_eq!(msft.len(), aapl.len());
        assert_ne!(msft[0].close(), aapl[0].close());
    }

    #[test]
    fn weekend_only_range_is_empty() {
        // 2024-01-06/07 is a Saturday/Sunday.
        let records = generate_series("AAPL", d(2024, 1, 6), d(2024, 1, 7));
        assert!(records.is_empty());
    }

    #[test]
    fn provider_uses_query_symbol() {
        let query = Query::new("nvda", d(2024, 1, 1), d(2024, 1, 5)).unwrap();
        let records = SyntheticProvider::new().fetch_prices(&query).unwrap();
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.symbol() == "NVDA"));
    }
}
