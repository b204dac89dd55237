//! PivotLab CLI: run the signal pipeline over a CSV of bars.
//!
//! Commands:
//! - `run`: load bars, slice a date range, compute every column and print
//!   signal rows (with the EMA and Bollinger overlays) to stdout as CSV

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::io;
use std::path::{Path, PathBuf};

use pivotlab_core::data::{load_bars_path, slice_date_range};
use pivotlab_core::{run_pipeline, PipelineConfig, SignalFrame};

#[derive(Parser)]
#[command(
    name = "pivotlab",
    about = "PivotLab CLI: pivot, volume-regime and candlestick signals over OHLCV bars"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and print signal rows as CSV.
    Run {
        /// CSV file with date|timestamp, open, high, low, close, volume columns.
        #[arg(long)]
        data: PathBuf,

        /// TOML pipeline config. Missing keys use the defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// First date to report (YYYY-MM-DD). Defaults to the first bar.
        #[arg(long)]
        start: Option<String>,

        /// Last date to report (YYYY-MM-DD). Defaults to the last bar.
        #[arg(long)]
        end: Option<String>,

        /// Extra bars before --start fed to the indicators for warmup.
        #[arg(long, default_value_t = 0)]
        prepare: usize,

        /// Print every row, not just rows carrying an entry or exit.
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            config,
            start,
            end,
            prepare,
            all,
        } => run_cmd(&data, config.as_deref(), start, end, prepare, all),
    }
}

fn parse_date(flag: &str, value: Option<String>) -> Result<Option<NaiveDate>> {
    value
        .as_deref()
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("--{flag} '{s}' is not a YYYY-MM-DD date"))
        })
        .transpose()
}

fn run_cmd(
    data: &Path,
    config_path: Option<&Path>,
    start: Option<String>,
    end: Option<String>,
    prepare: usize,
    all: bool,
) -> Result<()> {
    let start = parse_date("start", start)?;
    let end = parse_date("end", end)?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            bail!("--start {s} is after --end {e}");
        }
    }

    let config = match config_path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let bars = load_bars_path(data).with_context(|| format!("reading bars from {}", data.display()))?;
    let bars = slice_date_range(&bars, start, end, prepare)?;
    info!("running pipeline over {} bars from {}", bars.len(), data.display());

    let frame = run_pipeline(bars, &config)?;
    let written = write_rows(&frame, all)?;
    print_summary(&frame, written);
    Ok(())
}

fn write_rows(frame: &SignalFrame, all: bool) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    let written = frame.write_csv(&mut writer, !all)?;
    writer.flush().context("flushing stdout")?;
    Ok(written)
}

fn print_summary(frame: &SignalFrame, written: usize) {
    let summary = frame.summary();
    let fp = &frame.fingerprint;
    info!("rows written: {written} of {}", summary.bars);
    info!(
        "pivots: {} highs, {} lows; pattern rows: {} bullish, {} bearish",
        summary.pivot_highs,
        summary.pivot_lows,
        summary.bullish_pattern_rows,
        summary.bearish_pattern_rows,
    );
    info!(
        "volume regimes: {} neutral, {} bullish, {} bearish, {} base",
        summary.regimes.neutral, summary.regimes.bullish, summary.regimes.bearish, summary.regimes.base,
    );
    info!(
        "signals: {} long / {} short entries, {} long / {} short exits",
        summary.signals.enter_long,
        summary.signals.enter_short,
        summary.signals.exit_long,
        summary.signals.exit_short,
    );
    info!("config {} dataset {}", fp.config_hash, fp.dataset_hash);
}
