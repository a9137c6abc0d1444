//! Plain console tables.

use std::fmt::Write;

use sharelab_core::data::SymbolSummary;
use sharelab_core::domain::PriceRecord;
use sharelab_service::Comparison;

const SAMPLE_ROWS: usize = 3;

fn row(out: &mut String, r: &PriceRecord) {
    let _ = writeln!(
        out,
        "  {:<12} {:<10.2} {:<10.2} {:<10.2} {:<12.2}",
        r.date(),
        r.open(),
        r.high(),
        r.low(),
        r.close()
    );
}

/// Record count plus the first and last few rows.
pub fn price_summary(records: &[PriceRecord]) -> String {
    let mut out = String::new();
    if records.is_empty() {
        out.push_str("  No data returned.\n");
        return out;
    }

    let _ = writeln!(out, "  Total records: {}", records.len());
    out.push_str("  Sample records:\n");
    let _ = writeln!(
        out,
        "  {:<12} {:<10} {:<10} {:<10} {:<12}",
        "Date", "Open", "High", "Low", "Close"
    );
    let _ = writeln!(out, "  {}", "-".repeat(58));

    if records.len() <= SAMPLE_ROWS * 2 {
        records.iter().for_each(|r| row(&mut out, r));
    } else {
        records[..SAMPLE_ROWS].iter().for_each(|r| row(&mut out, r));
        out.push_str("  ...\n");
        records[records.len() - SAMPLE_ROWS..]
            .iter()
            .for_each(|r| row(&mut out, r));
    }
    out
}

/// One line per symbol: count, first close, last close, absolute change.
pub fn comparison_summary(comparison: &Comparison) -> String {
    let mut out = String::new();
    for (symbol, records) in comparison.iter() {
        let first = records.first().map_or(0.0, PriceRecord::close);
        let last = records.last().map_or(0.0, PriceRecord::close);
        let _ = writeln!(
            out,
            "  {:<5} | Records: {:>3} | First close: {:>7.2} | Last close: {:>7.2} | Change: {:+.2}",
            symbol,
            records.len(),
            first,
            last,
            last - first
        );
    }
    out
}

pub fn cache_summary(summaries: &[SymbolSummary]) -> String {
    let mut out = String::new();
    if summaries.is_empty() {
        out.push_str("  Cache is empty.\n");
        return out;
    }
    let _ = writeln!(out, "  {:<8} {:<25} {:>8}", "Symbol", "Date Range", "Records");
    let _ = writeln!(out, "  {}", "-".repeat(43));
    for s in summaries {
        let _ = writeln!(
            out,
            "  {:<8} {:<25} {:>8}",
            s.symbol,
            format!("{} to {}", s.first, s.last),
            s.records
        );
    }
    out
}
