//! Pipeline orchestration: one full pass from bars to a [`SignalFrame`].
//!
//! Stages:
//! 1. validate config and input length
//! 2. in parallel: oscillators (RSI, ADX, SAR), Hawkeye, raw pivots,
//!    candlestick aggregation, overlays
//! 3. forward-fill pivots
//! 4. rule engine, after every upstream column is ready
//!
//! Nothing is returned on error; a failed precondition aborts the run.

use log::{debug, info, warn};
use std::time::Instant;

use crate::candlestick::{aggregate_patterns, PatternRegistry};
use crate::config::PipelineConfig;
use crate::domain::Bar;
use crate::error::{Result, SignalError};
use crate::fingerprint::RunFingerprint;
use crate::frame::SignalFrame;
use crate::indicators::{Adx, Bollinger, BollingerBand, DerivedColumns, Ema, Indicator, ParabolicSar, Rsi};
use crate::pivot::{find_pivots, forward_fill, PivotKind};
use crate::signals::{generate_signals, SignalInputs};

struct Oscillators {
    rsi: Vec<f64>,
    adx: Vec<f64>,
    trend_stop: Vec<f64>,
}

fn timed<T>(stage: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    debug!("{stage}: {:.2?}", start.elapsed());
    out
}

fn compute_oscillators(bars: &[Bar], config: &PipelineConfig) -> Oscillators {
    let stop = &config.trend_stop;
    Oscillators {
        rsi: Rsi::new(config.oscillators.rsi_period).compute(bars),
        adx: Adx::new(config.oscillators.adx_period).compute(bars),
        trend_stop: ParabolicSar::with_acceleration(stop.acceleration, stop.maximum).compute(bars),
    }
}

fn compute_overlays(bars: &[Bar], config: &PipelineConfig) -> DerivedColumns {
    let overlays = &config.overlays;
    let mut columns = DerivedColumns::new();
    for &period in &overlays.ema_periods {
        columns.insert_indicator(&Ema::new(period), bars);
    }
    for band in BollingerBand::ALL {
        let bb = Bollinger::new(overlays.bollinger_window, overlays.bollinger_stds, band);
        columns.insert_indicator(&bb, bars);
    }
    columns
}

fn compute_pivots(bars: &[Bar], config: &PipelineConfig) -> Result<(Vec<Option<f64>>, Vec<Option<f64>>)> {
    let (left, right) = (config.pivot.left, config.pivot.right);
    let highs = find_pivots(bars, left, right, PivotKind::High)?;
    let lows = find_pivots(bars, left, right, PivotKind::Low)?;
    Ok((highs, lows))
}

/// Run the full pipeline with the built-in pattern detectors.
///
/// # Errors
/// - `InvalidWindow` / `InvalidConfig` from [`PipelineConfig::validate`]
/// - `InsufficientData` if `bars` cannot hold one pivot candidate
pub fn run_pipeline(bars: &[Bar], config: &PipelineConfig) -> Result<SignalFrame> {
    run_pipeline_with(bars, config, &PatternRegistry::builtin())
}

/// [`run_pipeline`] with a caller-supplied detector registry.
pub fn run_pipeline_with(
    bars: &[Bar],
    config: &PipelineConfig,
    registry: &PatternRegistry,
) -> Result<SignalFrame> {
    let started = Instant::now();
    config.validate()?;
    let required = config.pivot.min_rows();
    if bars.len() < required {
        return Err(SignalError::InsufficientData {
            required,
            actual: bars.len(),
        });
    }
    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        warn!("{insane} of {} bars fail OHLC sanity checks", bars.len());
    }
    let fingerprint = RunFingerprint::new(config.config_hash()?, bars);

    // Upstream stages read only the bars, never each other.
    let ((oscillators, hawkeye), ((pivots, patterns), overlays)) = rayon::join(
        || {
            rayon::join(
                || timed("oscillators", || compute_oscillators(bars, config)),
                || timed("hawkeye", || config.hawkeye.classify(bars)),
            )
        },
        || {
            rayon::join(
                || {
                    rayon::join(
                        || timed("pivots", || compute_pivots(bars, config)),
                        || timed("candlesticks", || aggregate_patterns(bars, registry)),
                    )
                },
                || timed("overlays", || compute_overlays(bars, config)),
            )
        },
    );
    let hawkeye = hawkeye?;
    let (pivot_high_raw, pivot_low_raw) = pivots?;
    let patterns = patterns?;

    let pivot_high = forward_fill(&pivot_high_raw);
    let pivot_low = forward_fill(&pivot_low_raw);

    let inputs = SignalInputs {
        bars,
        pivot_high: &pivot_high,
        pivot_low: &pivot_low,
        bullish_flag: &patterns.bullish_flag,
        bearish_flag: &patterns.bearish_flag,
        adx: &oscillators.adx,
        rsi: &oscillators.rsi,
        trend_stop: &oscillators.trend_stop,
    };
    let signals = timed("rules", || generate_signals(&inputs, &config.rules))?;

    let frame = SignalFrame {
        bars: bars.to_vec(),
        pivot_high_raw,
        pivot_low_raw,
        pivot_high,
        pivot_low,
        volume_avg: hawkeye.volume_avg,
        volume_regime: hawkeye.regime,
        patterns,
        rsi: oscillators.rsi,
        adx: oscillators.adx,
        trend_stop: oscillators.trend_stop,
        overlays,
        signals,
        fingerprint,
    };

    let summary = frame.summary();
    info!(
        "processed {} bars in {:.2?}: {} long / {} short entries, {} long / {} short exits",
        summary.bars,
        started.elapsed(),
        summary.signals.enter_long,
        summary.signals.enter_short,
        summary.signals.exit_long,
        summary.signals.exit_short,
    );
    Ok(frame)
}
