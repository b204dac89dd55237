//! Indicator trait and the named-column container for derived series.
//!
//! Indicators are pure functions: bar history in, numeric series out. They are
//! computed once per pass over an immutable bar sequence.

use crate::domain::Bar;
use std::collections::BTreeMap;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Column name (e.g., "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Named numeric columns aligned 1:1 with a bar sequence.
///
/// `BTreeMap` keeps column order deterministic for export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedColumns {
    series: BTreeMap<String, Vec<f64>>,
}

impl DerivedColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named series, replacing any previous one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Compute an indicator and store it under its own name.
    pub fn insert_indicator(&mut self, indicator: &dyn Indicator, bars: &[Bar]) {
        let values = indicator.compute(bars);
        debug_assert_eq!(values.len(), bars.len(), "{}", indicator.name());
        self.insert(indicator.name(), values);
    }

    /// Value of a named column at a row.
    pub fn get(&self, name: &str, row: usize) -> Option<f64> {
        self.series.get(name).and_then(|v| v.get(row).copied())
    }

    /// Full series for a named column.
    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Column names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    /// Iterate `(name, series)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
