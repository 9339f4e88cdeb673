//! TickerLake CLI — ingestion, refine, and store status commands.
//!
//! Commands:
//! - `ingest` — acquire daily history for one or more tickers and land it
//!   as raw partitions
//! - `refine` — transform + aggregate a series into the refined layer
//! - `status` — report per-series partition counts and date spans

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tickerlake_core::cancel::CancelToken;
use tickerlake_core::domain::normalize_ticker;
use tickerlake_core::store::{Layer, PartitionStore};
use tickerlake_pipeline::{
    run_ingestion_batch, run_refine, LoggingNotifier, PipelineConfig,
};

#[derive(Parser)]
#[command(
    name = "tickerlake",
    about = "TickerLake CLI — partitioned OHLCV ingestion and derivation pipeline"
)]
struct Cli {
    /// Path to a TOML pipeline config. Defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Partition store root. Overrides the config value.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire daily history and write raw partitions.
    Ingest {
        /// Tickers to ingest (e.g. PETR4 VALE3).
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Logical dataset name. Defaults to the normalized ticker.
        #[arg(long)]
        dataset: Option<String>,

        /// Calendar days of history to request, ending today.
        #[arg(long, default_value_t = 90)]
        lookback_days: u32,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Transform and aggregate a series into the refined layer.
    Refine {
        /// Ticker to refine.
        ticker: String,

        /// Logical dataset name. Defaults to the normalized ticker.
        #[arg(long)]
        dataset: Option<String>,
    },
    /// Report raw/refined partition counts and date spans per series.
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.store_dir {
        config.store_root = dir.clone();
    }

    match cli.command {
        Commands::Ingest {
            tickers,
            dataset,
            lookback_days,
            end,
        } => run_ingest_cmd(&config, tickers, dataset, lookback_days, end),
        Commands::Refine { ticker, dataset } => run_refine_cmd(&config, &ticker, dataset),
        Commands::Status => run_status_cmd(&config),
    }
}

fn run_ingest_cmd(
    config: &PipelineConfig,
    tickers: Vec<String>,
    dataset: Option<String>,
    lookback_days: u32,
    end: Option<String>,
) -> Result<()> {
    let end_date = end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("invalid --end date")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let store = PartitionStore::new(&config.store_root);
    let cancel = CancelToken::new();
    let coordinator = config.coordinator()?.with_cancel(cancel.clone());

    let results = run_ingestion_batch(
        &store,
        &coordinator,
        &tickers,
        dataset.as_deref(),
        lookback_days,
        end_date,
        &cancel,
    );

    let mut failed = 0usize;
    for (ticker, result) in &results {
        match result {
            Ok(report) => println!(
                "{}: {} records, {} partitions (source: {})",
                ticker, report.records_written, report.partitions_written, report.source
            ),
            Err(e) => {
                eprintln!("{ticker}: FAILED: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_refine_cmd(config: &PipelineConfig, ticker: &str, dataset: Option<String>) -> Result<()> {
    let dataset = dataset.unwrap_or_else(|| normalize_ticker(ticker));
    let store = PartitionStore::new(&config.store_root);

    let report = run_refine(config, &store, ticker, &dataset, &LoggingNotifier)?;

    println!("=== Refine Result ===");
    println!("Series:         {}/{}", report.dataset, report.ticker);
    println!("Daily written:  {}", report.daily_written);
    println!("Monthly groups: {}", report.monthly_groups);
    let stats = &report.period_summary.stats;
    println!();
    println!("--- Period Summary ---");
    println!("Trading days:   {}", stats.trading_days);
    println!("Span:           {} to {}", stats.first_date, stats.last_date);
    println!("Close mean:     {:.4}", stats.close_mean);
    println!("Close min/max:  {:.4} / {:.4}", stats.close_min, stats.close_max);
    match stats.close_stddev {
        Some(sd) => println!("Close stddev:   {sd:.4}"),
        None => println!("Close stddev:   (undefined — fewer than 2 days)"),
    }
    println!("Volume total:   {}", stats.volume_sum);

    Ok(())
}

fn run_status_cmd(config: &PipelineConfig) -> Result<()> {
    let root = &config.store_root;
    if !root.exists() {
        println!("Store directory does not exist: {}", root.display());
        return Ok(());
    }

    let store = PartitionStore::new(root);
    let series = discover_series(&root.join("raw"))?;

    if series.is_empty() {
        println!("Store is empty: {}", root.display());
        return Ok(());
    }

    println!("Store: {}", root.display());
    println!();
    println!(
        "{:<10} {:<10} {:<25} {:>6} {:>8} {:<12}",
        "Dataset", "Ticker", "Date Range", "Raw", "Refined", "Source"
    );
    println!("{}", "-".repeat(78));

    for (dataset, ticker) in &series {
        let raw = store.count_partitions(Layer::Raw, dataset, ticker);
        let refined = store.count_partitions(Layer::Refined, dataset, ticker);
        let (range, source) = match store.read_series_meta(dataset, ticker) {
            Some(meta) => (
                format!("{} to {}", meta.start_date, meta.end_date),
                meta.source,
            ),
            None => ("(no meta)".into(), "-".into()),
        };
        println!(
            "{:<10} {:<10} {:<25} {:>6} {:>8} {:<12}",
            dataset, ticker, range, raw, refined, source
        );
    }

    Ok(())
}

/// Enumerate (dataset, ticker) pairs present under the raw layer.
fn discover_series(raw_root: &Path) -> Result<Vec<(String, String)>> {
    let mut series = Vec::new();
    if !raw_root.exists() {
        return Ok(series);
    }

    for dataset_entry in std::fs::read_dir(raw_root)? {
        let dataset_entry = dataset_entry?;
        let dataset_name = dataset_entry.file_name().to_string_lossy().to_string();
        let Some(dataset) = dataset_name.strip_prefix("dataset=") else {
            continue;
        };

        for ticker_entry in std::fs::read_dir(dataset_entry.path())? {
            let ticker_entry = ticker_entry?;
            let ticker_name = ticker_entry.file_name().to_string_lossy().to_string();
            if let Some(ticker) = ticker_name.strip_prefix("ticker=") {
                series.push((dataset.to_string(), ticker.to_string()));
            }
        }
    }

    series.sort();
    Ok(series)
}
