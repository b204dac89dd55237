//! `SignalFrame`: the bars plus every derived column of one pipeline run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;

use crate::candlestick::PatternMatches;
use crate::domain::Bar;
use crate::error::Result;
use crate::fingerprint::RunFingerprint;
use crate::hawkeye::VolumeRegime;
use crate::indicators::DerivedColumns;
use crate::signals::{ExitTag, SignalColumns, SignalCounts};

/// Separator used when pattern name lists are flattened into one field.
pub const PATTERN_SEPARATOR: &str = "|";

/// Leading CSV columns of an exported row. Overlay columns follow in name order.
pub const ROW_COLUMNS: [&str; 21] = [
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "pivot_high",
    "pivot_low",
    "volume_avg",
    "volume_regime",
    "volume_color",
    "rsi",
    "adx",
    "sar",
    "bullish_patterns",
    "bearish_patterns",
    "enter_long",
    "enter_short",
    "exit_long",
    "exit_short",
    "exit_tag",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Derived table returned by [`crate::run_pipeline`]. Every column has one
/// entry per bar.
#[derive(Debug, Clone)]
pub struct SignalFrame {
    pub bars: Vec<Bar>,
    /// Pivots at their detection row only.
    pub pivot_high_raw: Vec<Option<f64>>,
    pub pivot_low_raw: Vec<Option<f64>>,
    /// Forward-filled pivots, as read by the rule engine.
    pub pivot_high: Vec<Option<f64>>,
    pub pivot_low: Vec<Option<f64>>,
    pub volume_avg: Vec<f64>,
    pub volume_regime: Vec<VolumeRegime>,
    pub patterns: PatternMatches,
    pub rsi: Vec<f64>,
    pub adx: Vec<f64>,
    pub trend_stop: Vec<f64>,
    /// EMA and Bollinger overlays keyed by column name.
    pub overlays: DerivedColumns,
    pub signals: SignalColumns,
    pub fingerprint: RunFingerprint,
}

/// One flattened row of a [`SignalFrame`], suitable for CSV or JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub pivot_high: Option<f64>,
    pub pivot_low: Option<f64>,
    pub volume_avg: f64,
    pub volume_regime: VolumeRegime,
    pub volume_color: String,
    pub rsi: f64,
    pub adx: f64,
    pub sar: f64,
    pub bullish_patterns: String,
    pub bearish_patterns: String,
    pub enter_long: bool,
    pub enter_short: bool,
    pub exit_long: bool,
    pub exit_short: bool,
    pub exit_tag: Option<ExitTag>,
    /// EMA and Bollinger values keyed by column name.
    pub overlays: BTreeMap<String, f64>,
}

impl SignalRow {
    pub fn has_signal(&self) -> bool {
        self.enter_long || self.enter_short || self.exit_long || self.exit_short
    }

    /// CSV fields in [`ROW_COLUMNS`] order, then the overlays.
    fn record(&self) -> Vec<String> {
        let price = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        let mut fields = vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.open.to_string(),
            self.high.to_string(),
            self.low.to_string(),
            self.close.to_string(),
            self.volume.to_string(),
            price(self.pivot_high),
            price(self.pivot_low),
            self.volume_avg.to_string(),
            self.volume_regime.to_string(),
            self.volume_color.clone(),
            self.rsi.to_string(),
            self.adx.to_string(),
            self.sar.to_string(),
            self.bullish_patterns.clone(),
            self.bearish_patterns.clone(),
            self.enter_long.to_string(),
            self.enter_short.to_string(),
            self.exit_long.to_string(),
            self.exit_short.to_string(),
            self.exit_tag.map(|t| t.to_string()).unwrap_or_default(),
        ];
        fields.extend(self.overlays.values().map(f64::to_string));
        fields
    }
}

/// Rows per volume regime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeCounts {
    pub neutral: usize,
    pub bullish: usize,
    pub bearish: usize,
    pub base: usize,
}

/// Headline numbers of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub bars: usize,
    pub pivot_highs: usize,
    pub pivot_lows: usize,
    pub bullish_pattern_rows: usize,
    pub bearish_pattern_rows: usize,
    pub regimes: RegimeCounts,
    pub signals: SignalCounts,
}

impl SignalFrame {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Flattened row `i`, or `None` past the end.
    pub fn row(&self, i: usize) -> Option<SignalRow> {
        let bar = self.bars.get(i)?;
        let regime = self.volume_regime[i];
        Some(SignalRow {
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            pivot_high: self.pivot_high[i],
            pivot_low: self.pivot_low[i],
            volume_avg: self.volume_avg[i],
            volume_regime: regime,
            volume_color: regime.color().to_string(),
            rsi: self.rsi[i],
            adx: self.adx[i],
            sar: self.trend_stop[i],
            bullish_patterns: self.patterns.bullish_patterns[i].join(PATTERN_SEPARATOR),
            bearish_patterns: self.patterns.bearish_patterns[i].join(PATTERN_SEPARATOR),
            enter_long: self.signals.enter_long[i],
            enter_short: self.signals.enter_short[i],
            exit_long: self.signals.exit_long[i],
            exit_short: self.signals.exit_short[i],
            exit_tag: self.signals.exit_tag[i],
            overlays: self
                .overlays
                .iter()
                .map(|(name, series)| (name.to_string(), series[i]))
                .collect(),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = SignalRow> + '_ {
        (0..self.len()).filter_map(|i| self.row(i))
    }

    /// Rows carrying at least one entry or exit flag.
    pub fn signal_rows(&self) -> impl Iterator<Item = SignalRow> + '_ {
        (0..self.len())
            .filter(|&i| self.signals.any_at(i))
            .filter_map(|i| self.row(i))
    }

    /// Write a header and one CSV record per row, overlays included.
    /// Returns the number of records written.
    pub fn write_csv<W: io::Write>(
        &self,
        writer: &mut csv::Writer<W>,
        signals_only: bool,
    ) -> Result<usize> {
        let header: Vec<&str> = ROW_COLUMNS.into_iter().chain(self.overlays.names()).collect();
        writer.write_record(&header)?;
        let mut written = 0;
        for row in self.rows().filter(|row| !signals_only || row.has_signal()) {
            writer.write_record(row.record())?;
            written += 1;
        }
        Ok(written)
    }

    pub fn summary(&self) -> FrameSummary {
        let mut regimes = RegimeCounts::default();
        for regime in &self.volume_regime {
            match regime {
                VolumeRegime::Neutral => regimes.neutral += 1,
                VolumeRegime::Bullish => regimes.bullish += 1,
                VolumeRegime::Bearish => regimes.bearish += 1,
                VolumeRegime::Base => regimes.base += 1,
            }
        }
        let present = |col: &[Option<f64>]| col.iter().filter(|v| v.is_some()).count();
        let flagged = |col: &[bool]| col.iter().filter(|&&f| f).count();
        FrameSummary {
            bars: self.len(),
            pivot_highs: present(&self.pivot_high_raw),
            pivot_lows: present(&self.pivot_low_raw),
            bullish_pattern_rows: flagged(&self.patterns.bullish_flag),
            bearish_pattern_rows: flagged(&self.patterns.bearish_flag),
            regimes,
            signals: self.signals.counts(),
        }
    }
}
