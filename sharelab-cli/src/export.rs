//! CSV and JSON export of a retrieved price series.

use std::path::Path;

use anyhow::{bail, Context, Result};
use sharelab_core::domain::PriceRecord;

// ─── CSV export ─────────────────────────────────────────────────────

/// Render records as CSV.
///
/// Columns: date, open, high, low, close, volume, sma. The `sma` column is
/// empty when no moving average is given.
pub fn export_prices_csv(records: &[PriceRecord], sma: Option<&[f64]>) -> Result<String> {
    if let Some(sma) = sma {
        if sma.len() != records.len() {
            bail!(
                "moving average has {} values for {} records",
                sma.len(),
                records.len()
            );
        }
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "open", "high", "low", "close", "volume", "sma"])?;

    for (i, r) in records.iter().enumerate() {
        let sma_cell = sma.map(|s| format!("{:.6}", s[i])).unwrap_or_default();
        wtr.write_record([
            &r.date().to_string(),
            &format!("{:.6}", r.open()),
            &format!("{:.6}", r.high()),
            &format!("{:.6}", r.low()),
            &format!("{:.6}", r.close()),
            &r.volume().to_string(),
            &sma_cell,
        ])?;
    }

    let bytes = wtr.into_inner().context("flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Write the CSV rendering of `records` to `path`.
pub fn write_prices_csv(path: &Path, records: &[PriceRecord], sma: Option<&[f64]>) -> Result<()> {
    let csv = export_prices_csv(records, sma)?;
    std::fs::write(path, csv).with_context(|| format!("write CSV to {}", path.display()))
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_prices_json(records: &[PriceRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("serialize price records to JSON")
}
