//! ShareLab CLI: cache-first share price lookup.
//!
//! Commands:
//! - `prices`: daily prices for one symbol, with moving average and optional CSV/JSON export
//! - `compare`: two symbols over the same range
//! - `demo`: scripted walkthrough showing cache-first behaviour

mod export;
mod render;

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sharelab_core::data::{
    CircuitBreaker, GuardedProvider, OfflineProvider, PriceCache, PriceProvider, SyntheticProvider,
};
use sharelab_core::domain::{Query, ValidationError};
use sharelab_service::{PriceService, ProviderKind, ServiceConfig, ServiceError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sharelab",
    about = "ShareLab CLI: cache-first share price lookup and moving averages"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Offline mode: answer from the cache only.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Deadline for a single provider fetch, in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log filter (e.g. warn, info, sharelab_service=debug). Defaults to RUST_LOG, then warn.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily prices for one symbol.
    Prices {
        /// Ticker symbol (case-insensitive).
        symbol: String,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        from: String,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        to: String,

        /// Moving average window in records.
        #[arg(long, default_value_t = 20)]
        sma: usize,

        /// Write the series and its moving average to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the records as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compare two symbols over the same date range.
    Compare {
        first: String,
        second: String,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        from: String,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        to: String,
    },
    /// Walk through single lookup, comparison, cache reuse and cache summary.
    Demo,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", describe_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let service = build_service(&config);

    match cli.command {
        Commands::Prices {
            symbol,
            from,
            to,
            sma,
            csv,
            json,
        } => run_prices(&service, &symbol, &from, &to, sma, csv, json),
        Commands::Compare {
            first,
            second,
            from,
            to,
        } => run_compare(&service, &first, &second, &from, &to),
        Commands::Demo => {
            run_demo(&service, config.cache.evict_older_than_days);
            Ok(())
        }
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    if cli.offline {
        config.provider.kind = ProviderKind::Offline;
    }
    if let Some(ms) = cli.timeout_ms {
        config.service.fetch_timeout_ms = Some(ms);
    }
    config.validate()?;
    Ok(config)
}

fn build_service(config: &ServiceConfig) -> PriceService {
    let provider: Arc<dyn PriceProvider> = match config.provider.kind {
        ProviderKind::Synthetic => {
            let breaker = Arc::new(CircuitBreaker::new(
                config.provider.failure_threshold,
                config.cooldown(),
            ));
            Arc::new(GuardedProvider::new(SyntheticProvider::new(), breaker))
        }
        ProviderKind::Offline => Arc::new(OfflineProvider),
    };
    info!(provider = provider.name(), "provider selected");

    let service = PriceService::with_config(Arc::new(PriceCache::new()), provider, config);
    if let Some(days) = config.cache.evict_older_than_days {
        let removed = service.evict_older_than(days);
        debug!(days, removed, "start-up eviction");
    }
    service
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn build_query(symbol: &str, from: &str, to: &str) -> Result<Query> {
    Ok(Query::new(symbol, parse_date(from)?, parse_date(to)?)?)
}

/// User-facing message, tagged by the layer that failed.
fn describe_error(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<ValidationError>() {
        return format!("[Validation Error] {e}");
    }
    if let Some(e) = err.downcast_ref::<ServiceError>() {
        let mut message = format!("[Service Error] {e}");
        let mut cause = e.source();
        while let Some(c) = cause {
            message.push_str(&format!("\n  caused by: {c}"));
            cause = c.source();
        }
        return message;
    }
    format!("Error: {err:#}")
}

fn run_prices(
    service: &PriceService,
    symbol: &str,
    from: &str,
    to: &str,
    window: usize,
    csv: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    if window == 0 {
        bail!("--sma must be at least 1");
    }
    let query = build_query(symbol, from, to)?;
    let retrieval = service.retrieve(&query)?;
    let sma = service.calculate_moving_average(&retrieval.records, window);

    if let Some(path) = &csv {
        export::write_prices_csv(path, &retrieval.records, Some(&sma))?;
    }

    if json {
        println!("{}", export::export_prices_json(&retrieval.records)?);
        return Ok(());
    }

    println!("=== {query} (from {}) ===", retrieval.source.label());
    print!("{}", render::price_summary(&retrieval.records));
    if let Some(last) = sma.last() {
        println!("  {window}-day SMA on last record: {last:.2}");
    }
    if let Some(path) = &csv {
        println!("CSV written to: {}", path.display());
    }
    Ok(())
}

fn run_compare(
    service: &PriceService,
    first: &str,
    second: &str,
    from: &str,
    to: &str,
) -> Result<()> {
    let a = build_query(first, from, to)?;
    let b = build_query(second, from, to)?;
    let comparison = service.compare_prices(&a, &b)?;

    println!("=== Comparison: {} vs {} ===", a.symbol(), b.symbol());
    print!("{}", render::comparison_summary(&comparison));
    Ok(())
}

fn demo_query(symbol: &str, from: (i32, u32, u32), to: (i32, u32, u32)) -> Result<Query> {
    let day = |(y, m, d): (i32, u32, u32)| {
        NaiveDate::from_ymd_opt(y, m, d).with_context(|| format!("invalid date {y}-{m}-{d}"))
    };
    Ok(Query::new(symbol, day(from)?, day(to)?)?)
}

fn demo_single(service: &PriceService) -> Result<()> {
    let query = demo_query("AAPL", (2024, 1, 1), (2024, 3, 31))?;
    let records = service.get_prices(&query)?;
    print!("{}", render::price_summary(&records));
    let sma = service.calculate_moving_average(&records, 20);
    println!(
        "  20-day SMA on last record: {:.2}",
        sma.last().copied().unwrap_or(0.0)
    );
    Ok(())
}

fn demo_comparison(service: &PriceService) -> Result<()> {
    let a = demo_query("AAPL", (2024, 1, 1), (2024, 1, 31))?;
    let b = demo_query("MSFT", (2024, 1, 1), (2024, 1, 31))?;
    let comparison = service.compare_prices(&a, &b)?;
    print!("{}", render::comparison_summary(&comparison));
    Ok(())
}

fn demo_repeat(service: &PriceService) -> Result<()> {
    let query = demo_query("AAPL", (2024, 1, 1), (2024, 1, 31))?;
    let retrieval = service.retrieve(&query)?;
    println!(
        "  {} records from {}",
        retrieval.records.len(),
        retrieval.source.label()
    );
    Ok(())
}

fn run_demo(service: &PriceService, evict_days: Option<u32>) {
    println!("=== ShareLab Demo ===");
    println!("Provider: {}", service.provider_name());

    let steps: [(&str, fn(&PriceService) -> Result<()>); 3] = [
        ("Single Query: AAPL (2024-01-01 to 2024-03-31)", demo_single),
        ("Comparison: AAPL vs MSFT", demo_comparison),
        ("Repeated Query: AAPL (2024-01-01 to 2024-01-31)", demo_repeat),
    ];
    for (title, step) in steps {
        println!();
        println!("=== {title} ===");
        if let Err(err) = step(service) {
            println!("  {}", describe_error(&err));
        }
    }

    println!();
    if let Some(days) = evict_days {
        let removed = service.evict_older_than(days);
        println!("Evicted {removed} record(s) older than {days} days.");
    }
    println!("=== Cache Summary ===");
    print!("{}", render::cache_summary(&service.cache().summary()));
}
