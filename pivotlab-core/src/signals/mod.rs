//! Signal rule engine: combines pivots, candlestick flags, oscillators and the
//! trend stop into entry and exit flags.
//!
//! Every rule reads only its own row (and the previous row for exits), so the
//! engine is a single pass over aligned columns. It runs after all upstream
//! columns are complete.

pub mod rules;

pub use rules::{ExitTag, SignalRules};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::{require_len, Result};

/// Borrowed, row-aligned inputs of [`generate_signals`].
///
/// Pivots must already be forward-filled. `trend_stop` is the parabolic SAR
/// (or any stop-and-reverse series).
#[derive(Debug, Clone, Copy)]
pub struct SignalInputs<'a> {
    pub bars: &'a [Bar],
    pub pivot_high: &'a [Option<f64>],
    pub pivot_low: &'a [Option<f64>],
    pub bullish_flag: &'a [bool],
    pub bearish_flag: &'a [bool],
    pub adx: &'a [f64],
    pub rsi: &'a [f64],
    pub trend_stop: &'a [f64],
}

impl SignalInputs<'_> {
    fn check_aligned(&self) -> Result<()> {
        let n = self.bars.len();
        require_len("pivot_high", n, self.pivot_high.len())?;
        require_len("pivot_low", n, self.pivot_low.len())?;
        require_len("bullish_flag", n, self.bullish_flag.len())?;
        require_len("bearish_flag", n, self.bearish_flag.len())?;
        require_len("adx", n, self.adx.len())?;
        require_len("rsi", n, self.rsi.len())?;
        require_len("trend_stop", n, self.trend_stop.len())
    }
}

/// Entry/exit flags, one entry per bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalColumns {
    pub enter_long: Vec<bool>,
    pub enter_short: Vec<bool>,
    pub exit_long: Vec<bool>,
    pub exit_short: Vec<bool>,
    pub exit_tag: Vec<Option<ExitTag>>,
}

/// Number of rows carrying each flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub enter_long: usize,
    pub enter_short: usize,
    pub exit_long: usize,
    pub exit_short: usize,
}

impl SignalColumns {
    fn with_rows(n: usize) -> Self {
        Self {
            enter_long: vec![false; n],
            enter_short: vec![false; n],
            exit_long: vec![false; n],
            exit_short: vec![false; n],
            exit_tag: vec![None; n],
        }
    }

    pub fn len(&self) -> usize {
        self.enter_long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enter_long.is_empty()
    }

    /// Rows flagged for both a long and a short entry.
    ///
    /// Always empty while the RSI bands do not overlap; kept observable rather
    /// than asserted.
    pub fn conflicting_entries(&self) -> Vec<usize> {
        self.enter_long
            .iter()
            .zip(&self.enter_short)
            .enumerate()
            .filter(|&(_, (&long, &short))| long && short)
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether row `i` carries any flag.
    pub fn any_at(&self, i: usize) -> bool {
        self.enter_long[i] || self.enter_short[i] || self.exit_long[i] || self.exit_short[i]
    }

    pub fn counts(&self) -> SignalCounts {
        let count = |flags: &[bool]| flags.iter().filter(|&&f| f).count();
        SignalCounts {
            enter_long: count(&self.enter_long),
            enter_short: count(&self.enter_short),
            exit_long: count(&self.exit_long),
            exit_short: count(&self.exit_short),
        }
    }
}

/// Evaluate the entry and exit rules on every row.
///
/// - Entries need a pivot: rows before the first pivot of a kind never enter.
/// - Exits compare the stop on this row and the previous one, so row 0 never
///   exits.
/// - When both exits fire on a row the tag is [`ExitTag::ShortSar`].
/// - NaN oscillator or stop values make their comparisons false.
///
/// # Errors
/// `LengthMismatch` if any column is not aligned with `bars`.
pub fn generate_signals(inputs: &SignalInputs<'_>, rules: &SignalRules) -> Result<SignalColumns> {
    inputs.check_aligned()?;
    let bars = inputs.bars;
    let mut out = SignalColumns::with_rows(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let trending = inputs.adx[i] > rules.adx_min;

        if let Some(pivot_high) = inputs.pivot_high[i] {
            out.enter_short[i] = bar.high > pivot_high
                && inputs.bearish_flag[i]
                && bar.open < pivot_high
                && trending
                && inputs.rsi[i] > rules.rsi_short_min;
        }

        if let Some(pivot_low) = inputs.pivot_low[i] {
            out.enter_long[i] = bar.low < pivot_low
                && inputs.bullish_flag[i]
                && bar.open > pivot_low
                && trending
                && inputs.rsi[i] <= rules.rsi_long_max;
        }

        let Some(prev_i) = i.checked_sub(1) else {
            continue;
        };
        let prev = &bars[prev_i];
        let (stop, prev_stop) = (inputs.trend_stop[i], inputs.trend_stop[prev_i]);
        let traded = bar.volume > 0.0;

        if bar.high <= stop && prev.low > prev_stop && traded {
            out.exit_long[i] = true;
            out.exit_tag[i] = Some(ExitTag::LongSar);
        }
        if bar.low >= stop && prev.high < prev_stop && traded {
            out.exit_short[i] = true;
            out.exit_tag[i] = Some(ExitTag::ShortSar);
        }
    }

    let conflicts = out.conflicting_entries();
    if !conflicts.is_empty() {
        warn!(
            "{} rows flagged for both long and short entry (first at row {})",
            conflicts.len(),
            conflicts[0]
        );
    }
    debug!("rule engine: {:?} over {} rows", out.counts(), bars.len());

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignalError;
    use crate::indicators::{make_ohlc_bars, Indicator, ParabolicSar};

    /// Owned columns so each test can tweak one input.
    struct Fixture {
        bars: Vec<Bar>,
        pivot_high: Vec<Option<f64>>,
        pivot_low: Vec<Option<f64>>,
        bullish: Vec<bool>,
        bearish: Vec<bool>,
        adx: Vec<f64>,
        rsi: Vec<f64>,
        stop: Vec<f64>,
    }

    impl Fixture {
        fn new(ohlc: &[(f64, f64, f64, f64)]) -> Self {
            let n = ohlc.len();
            Self {
                bars: make_ohlc_bars(ohlc),
                pivot_high: vec![None; n],
                pivot_low: vec![None; n],
                bullish: vec![false; n],
                bearish: vec![false; n],
                adx: vec![30.0; n],
                rsi: vec![50.0; n],
                stop: vec![f64::NAN; n],
            }
        }

        fn run(&self) -> Result<SignalColumns> {
            let inputs = SignalInputs {
                bars: &self.bars,
                pivot_high: &self.pivot_high,
                pivot_low: &self.pivot_low,
                bullish_flag: &self.bullish,
                bearish_flag: &self.bearish,
                adx: &self.adx,
                rsi: &self.rsi,
                trend_stop: &self.stop,
            };
            generate_signals(&inputs, &SignalRules::default())
        }
    }

    /// Row 1 pokes above a pivot high of 10 after opening below it.
    fn short_setup() -> Fixture {
        let mut f = Fixture::new(&[(9.0, 9.8, 8.5, 9.5), (9.5, 10.5, 9.0, 9.2)]);
        f.pivot_high = vec![Some(10.0); 2];
        f.bearish[1] = true;
        f.rsi[1] = 65.0;
        f
    }

    /// Row 1 dips below a pivot low of 10 after opening above it.
    fn long_setup() -> Fixture {
        let mut f = Fixture::new(&[(11.0, 11.5, 10.2, 11.0), (10.5, 11.0, 9.5, 10.8)]);
        f.pivot_low = vec![Some(10.0); 2];
        f.bullish[1] = true;
        f.rsi[1] = 40.0;
        f
    }

    #[test]
    fn short_entry_fires() {
        let out = short_setup().run().unwrap();
        assert_eq!(out.enter_short, vec![false, true]);
        assert_eq!(out.enter_long, vec![false, false]);
    }

    #[test]
    fn short_entry_needs_every_condition() {
        let mut f = short_setup();
        f.rsi[1] = 60.0;
        assert!(!f.run().unwrap().enter_short[1]);

        let mut f = short_setup();
        f.adx[1] = 25.0;
        assert!(!f.run().unwrap().enter_short[1]);

        let mut f = short_setup();
        f.bearish[1] = false;
        assert!(!f.run().unwrap().enter_short[1]);

        let mut f = short_setup();
        f.bars[1].open = 10.0;
        assert!(!f.run().unwrap().enter_short[1]);

        let mut f = short_setup();
        f.pivot_high[1] = None;
        assert!(!f.run().unwrap().enter_short[1]);
    }

    #[test]
    fn long_entry_fires_at_rsi_boundary() {
        let out = long_setup().run().unwrap();
        assert_eq!(out.enter_long, vec![false, true]);

        let mut f = long_setup();
        f.rsi[1] = 40.5;
        assert!(!f.run().unwrap().enter_long[1]);

        let mut f = long_setup();
        f.adx[1] = f64::NAN;
        assert!(!f.run().unwrap().enter_long[1]);
    }

    #[test]
    fn exit_long_when_stop_flips_above_price() {
        let mut f = Fixture::new(&[(10.5, 11.0, 10.0, 10.8), (10.8, 11.0, 10.1, 10.2)]);
        f.stop = vec![9.0, 12.0];
        let out = f.run().unwrap();
        assert_eq!(out.exit_long, vec![false, true]);
        assert_eq!(out.exit_short, vec![false, false]);
        assert_eq!(out.exit_tag, vec![None, Some(ExitTag::LongSar)]);
    }

    #[test]
    fn exit_short_when_stop_flips_below_price() {
        let mut f = Fixture::new(&[(11.0, 12.0, 10.5, 11.5), (11.5, 12.5, 9.0, 12.0)]);
        f.stop = vec![13.0, 8.0];
        let out = f.run().unwrap();
        assert_eq!(out.exit_short, vec![false, true]);
        assert_eq!(out.exit_tag[1], Some(ExitTag::ShortSar));
    }

    #[test]
    fn exit_long_on_outside_bar_sar_flip() {
        let mut f = Fixture::new(&[
            (100.0, 105.0, 98.0, 103.0),
            (103.0, 108.0, 101.0, 107.0),
            (107.0, 112.0, 105.0, 111.0),
            (111.0, 115.0, 109.0, 114.0),
            (114.0, 120.0, 95.0, 100.0),
        ]);
        f.stop = ParabolicSar::default_params().compute(&f.bars);
        let out = f.run().unwrap();
        assert_eq!(out.exit_long, vec![false, false, false, false, true]);
        assert_eq!(out.exit_tag[4], Some(ExitTag::LongSar));
    }

    #[test]
    fn exits_need_volume() {
        let mut f = Fixture::new(&[(10.5, 11.0, 10.0, 10.8), (10.8, 11.0, 10.1, 10.2)]);
        f.stop = vec![9.0, 12.0];
        f.bars[1].volume = 0.0;
        assert!(!f.run().unwrap().exit_long[1]);
    }

    #[test]
    fn short_tag_wins_when_both_exits_fire() {
        // Inverted previous bar (low above high) straddling its stop, flat current bar on the stop
        let mut f = Fixture::new(&[(10.0, 9.0, 11.0, 10.0), (10.0, 10.0, 10.0, 10.0)]);
        f.stop = vec![10.0, 10.0];
        let out = f.run().unwrap();
        assert!(out.exit_long[1] && out.exit_short[1]);
        assert_eq!(out.exit_tag[1], Some(ExitTag::ShortSar));
    }

    #[test]
    fn row_zero_never_exits() {
        let mut f = Fixture::new(&[(10.0, 11.0, 9.0, 10.0)]);
        f.stop = vec![100.0];
        let out = f.run().unwrap();
        assert_eq!(out.exit_long, vec![false]);
        f.stop = vec![-100.0];
        let out = f.run().unwrap();
        assert_eq!(out.exit_short, vec![false]);
        assert_eq!(out.exit_tag, vec![None]);
    }

    #[test]
    fn misaligned_column_rejected() {
        let mut f = short_setup();
        f.rsi.pop();
        let err = f.run().unwrap_err();
        assert!(matches!(err, SignalError::LengthMismatch { column: "rsi", .. }));
    }

    #[test]
    fn counts_and_conflicts() {
        let mut cols = SignalColumns::with_rows(3);
        cols.enter_long[1] = true;
        cols.enter_short[1] = true;
        cols.exit_long[2] = true;
        assert_eq!(cols.conflicting_entries(), vec![1]);
        assert_eq!(
            cols.counts(),
            SignalCounts {
                enter_long: 1,
                enter_short: 1,
                exit_long: 1,
                exit_short: 0
            }
        );
        assert!(!cols.any_at(0));
        assert!(cols.any_at(2));
    }
}
