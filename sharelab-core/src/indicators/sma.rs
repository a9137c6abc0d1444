//! Simple Moving Average (SMA) with a shrinking window at the start.
//!
//! Value `i` is the mean close over `[max(0, i - window + 1), i]`, so the
//! first `window - 1` values average fewer records instead of being NaN.

use crate::domain::PriceRecord;

/// Moving average over a fixed trailing window of records.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    name: String,
}

impl MovingAverage {
    /// Panics if `window` is zero.
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "moving average window must be >= 1");
        Self {
            window,
            name: format!("sma_{window}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// One value per input record, aligned by index.
    pub fn compute(&self, records: &[PriceRecord]) -> Vec<f64> {
        let closes: Vec<f64> = records.iter().map(PriceRecord::close).collect();
        self.compute_closes(&closes)
    }

    /// Same as [`MovingAverage::compute`] over raw closing prices.
    ///
    /// Each window is summed independently of its neighbours.
    pub fn compute_closes(&self, closes: &[f64]) -> Vec<f64> {
        (0..closes.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(self.window);
                let window = &closes[start..=i];
                window.iter().sum::<f64>() / window.len() as f64
            })
            .collect()
    }
}

/// Convenience wrapper: `MovingAverage::new(window).compute(records)`.
pub fn moving_average(records: &[PriceRecord], window: usize) -> Vec<f64> {
    MovingAverage::new(window).compute(records)
}
