//! Candlestick aggregation: unions per-pattern detector output into bullish and
//! bearish flags.
//!
//! Detectors are opaque: each takes aligned OHLC arrays and returns a ternary
//! [`PatternSignal`] per row. The aggregator only collects names. A row may be
//! flagged on both sides at once.
//!
//! Adding a detector means registering it in a [`PatternRegistry`]; the
//! aggregation code never changes.

pub mod patterns;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, OhlcvColumns};
use crate::error::{require_len, Result};

/// Per-row output of one detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSignal {
    Bullish,
    Bearish,
    NoMatch,
}

impl PatternSignal {
    /// Interpret a TA-style integer code by sign (`+100`/`+1` bullish,
    /// negative bearish, zero none).
    pub fn from_code(code: i32) -> Self {
        match code.signum() {
            1 => Self::Bullish,
            -1 => Self::Bearish,
            _ => Self::NoMatch,
        }
    }

    /// Ternary code: `+1`, `-1` or `0`.
    pub fn code(&self) -> i32 {
        match self {
            Self::Bullish => 1,
            Self::Bearish => -1,
            Self::NoMatch => 0,
        }
    }
}

/// A named candlestick pattern detector.
///
/// `detect` must return exactly one signal per row of `ohlc`.
pub trait PatternDetector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, ohlc: &OhlcvColumns) -> Vec<PatternSignal>;
}

/// Detector signature used by the built-in patterns.
pub type DetectorFn = fn(&OhlcvColumns) -> Vec<PatternSignal>;

/// A pure function paired with its pattern name.
#[derive(Debug, Clone, Copy)]
pub struct FnDetector {
    name: &'static str,
    detect: DetectorFn,
}

impl FnDetector {
    pub const fn new(name: &'static str, detect: DetectorFn) -> Self {
        Self { name, detect }
    }
}

impl PatternDetector for FnDetector {
    fn name(&self) -> &str {
        self.name
    }

    fn detect(&self, ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
        (self.detect)(ohlc)
    }
}

/// Ordered list of detectors fed to [`aggregate_patterns`].
pub struct PatternRegistry {
    detectors: Vec<Box<dyn PatternDetector>>,
}

impl PatternRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Registry holding every built-in detector in [`patterns::BUILTIN`] order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for detector in patterns::BUILTIN {
            registry.register(detector);
        }
        registry
    }

    pub fn register(&mut self, detector: impl PatternDetector + 'static) -> &mut Self {
        self.detectors.push(Box::new(detector));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRegistry")
            .field("detectors", &self.names())
            .finish()
    }
}

/// Aggregated candlestick columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternMatches {
    /// Names of bullish matches per row, in registry order.
    pub bullish_patterns: Vec<Vec<String>>,
    /// Names of bearish matches per row, in registry order.
    pub bearish_patterns: Vec<Vec<String>>,
    pub bullish_flag: Vec<bool>,
    pub bearish_flag: Vec<bool>,
}

impl PatternMatches {
    fn with_rows(n: usize) -> Self {
        Self {
            bullish_patterns: vec![Vec::new(); n],
            bearish_patterns: vec![Vec::new(); n],
            bullish_flag: vec![false; n],
            bearish_flag: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.bullish_flag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bullish_flag.is_empty()
    }
}

/// Run every detector in `registry` over `bars` and union the matches per row.
///
/// # Errors
/// `LengthMismatch` if a detector returns a series of the wrong length.
pub fn aggregate_patterns(bars: &[Bar], registry: &PatternRegistry) -> Result<PatternMatches> {
    aggregate_columns(&OhlcvColumns::from_bars(bars), registry)
}

/// [`aggregate_patterns`] over pre-split columns.
pub fn aggregate_columns(ohlc: &OhlcvColumns, registry: &PatternRegistry) -> Result<PatternMatches> {
    let n = ohlc.len();
    // Detectors are independent; collect keeps registry order.
    let outputs: Vec<(&str, Vec<PatternSignal>)> = registry
        .detectors
        .par_iter()
        .map(|d| (d.name(), d.detect(ohlc)))
        .collect();

    let mut matches = PatternMatches::with_rows(n);
    for (name, signals) in outputs {
        require_len("candlestick pattern", n, signals.len())?;
        for (i, signal) in signals.into_iter().enumerate() {
            match signal {
                PatternSignal::Bullish => matches.bullish_patterns[i].push(name.to_string()),
                PatternSignal::Bearish => matches.bearish_patterns[i].push(name.to_string()),
                PatternSignal::NoMatch => {}
            }
        }
    }
    for i in 0..n {
        matches.bullish_flag[i] = !matches.bullish_patterns[i].is_empty();
        matches.bearish_flag[i] = !matches.bearish_patterns[i].is_empty();
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignalError;
    use crate::indicators::make_bars;

    fn every_third_bullish(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
        (0..ohlc.len())
            .map(|i| {
                if i % 3 == 0 {
                    PatternSignal::Bullish
                } else {
                    PatternSignal::NoMatch
                }
            })
            .collect()
    }

    fn even_rows_bearish(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
        (0..ohlc.len())
            .map(|i| {
                if i % 2 == 0 {
                    PatternSignal::Bearish
                } else {
                    PatternSignal::NoMatch
                }
            })
            .collect()
    }

    fn row_one_bullish(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
        (0..ohlc.len())
            .map(|i| PatternSignal::from_code(if i == 1 { 100 } else { 0 }))
            .collect()
    }

    fn truncated(_: &OhlcvColumns) -> Vec<PatternSignal> {
        vec![PatternSignal::NoMatch]
    }

    fn registry(detectors: &[(&'static str, DetectorFn)]) -> PatternRegistry {
        let mut registry = PatternRegistry::new();
        for &(name, f) in detectors {
            registry.register(FnDetector::new(name, f));
        }
        registry
    }

    #[test]
    fn signal_codes() {
        assert_eq!(PatternSignal::from_code(100), PatternSignal::Bullish);
        assert_eq!(PatternSignal::from_code(-80), PatternSignal::Bearish);
        assert_eq!(PatternSignal::from_code(0), PatternSignal::NoMatch);
        assert_eq!(PatternSignal::Bearish.code(), -1);
    }

    #[test]
    fn union_collects_names_per_side() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let reg = registry(&[
            ("THIRD", every_third_bullish),
            ("EVEN", even_rows_bearish),
            ("ONE", row_one_bullish),
        ]);
        let m = aggregate_patterns(&bars, &reg).unwrap();

        assert_eq!(m.len(), 7);
        assert_eq!(m.bullish_patterns[0], vec!["THIRD"]);
        assert_eq!(m.bearish_patterns[0], vec!["EVEN"]);
        // Both sides flagged independently
        assert!(m.bullish_flag[0] && m.bearish_flag[0]);
        assert_eq!(m.bullish_patterns[1], vec!["ONE"]);
        assert!(!m.bearish_flag[1]);
        assert!(!m.bullish_flag[5] && !m.bearish_flag[5]);
    }

    #[test]
    fn flags_ignore_detector_order() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let forward = registry(&[
            ("THIRD", every_third_bullish),
            ("EVEN", even_rows_bearish),
            ("ONE", row_one_bullish),
        ]);
        let reversed = registry(&[
            ("ONE", row_one_bullish),
            ("EVEN", even_rows_bearish),
            ("THIRD", every_third_bullish),
        ]);
        let a = aggregate_patterns(&bars, &forward).unwrap();
        let b = aggregate_patterns(&bars, &reversed).unwrap();
        assert_eq!(a.bullish_flag, b.bullish_flag);
        assert_eq!(a.bearish_flag, b.bearish_flag);
    }

    #[test]
    fn empty_registry_flags_nothing() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let m = aggregate_patterns(&bars, &PatternRegistry::new()).unwrap();
        assert_eq!(m.bullish_flag, vec![false; 3]);
        assert!(m.bearish_patterns.iter().all(Vec::is_empty));
    }

    #[test]
    fn misaligned_detector_output_is_rejected() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let reg = registry(&[("SHORT", truncated)]);
        let err = aggregate_patterns(&bars, &reg).unwrap_err();
        assert!(matches!(err, SignalError::LengthMismatch { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn builtin_registry_names() {
        let reg = PatternRegistry::default();
        assert_eq!(reg.len(), patterns::BUILTIN.len());
        assert!(reg.names().contains(&"CDLHAMMER"));
        assert!(reg.names().contains(&"CDLEVENINGDOJISTAR"));
    }
}
