//! Pivot extraction: local extrema over asymmetric look-back/look-forward windows.
//!
//! A pivot low at row `i` is strictly below every low in the `left` rows
//! before it and at or below every low in the `right` rows after it. Pivot
//! highs mirror the rule. Ties on the trailing side therefore keep a pivot,
//! ties on the leading side disqualify it.
//!
//! The raw output is sparse. The rule engine consumes the forward-filled form
//! produced by [`forward_fill`].
//!
//! Pivots confirm `right` bars late by construction: the value at row `i`
//! depends on rows up to `i + right`.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, PriceField};
use crate::error::{require_window, Result, SignalError};

/// Which extremum to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotKind {
    Low,
    High,
}

impl PivotKind {
    /// Bar field the extremum is measured on.
    pub fn field(&self) -> PriceField {
        match self {
            Self::Low => PriceField::Low,
            Self::High => PriceField::High,
        }
    }

    /// `candidate` beats a leading-window value (strict).
    fn beats_leading(&self, candidate: f64, other: f64) -> bool {
        match self {
            Self::Low => candidate < other,
            Self::High => candidate > other,
        }
    }

    /// `candidate` holds against a trailing-window value (ties allowed).
    fn holds_trailing(&self, candidate: f64, other: f64) -> bool {
        match self {
            Self::Low => candidate <= other,
            Self::High => candidate >= other,
        }
    }
}

/// Window sizes for pivot detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotParams {
    pub left: usize,
    pub right: usize,
}

impl Default for PivotParams {
    fn default() -> Self {
        Self { left: 10, right: 2 }
    }
}

impl PivotParams {
    pub fn validate(&self) -> Result<()> {
        require_window("pivot.left", self.left)?;
        require_window("pivot.right", self.right)
    }

    /// Smallest input that can hold one candidate row.
    pub fn min_rows(&self) -> usize {
        self.left + self.right + 1
    }
}

/// Find pivots of `kind` over `bars`.
///
/// Returns one entry per bar: `Some(value)` on a detected extremum, `None`
/// elsewhere, including the first `left` and last `right` rows.
///
/// # Errors
/// - `InvalidWindow` if `left` or `right` is zero
/// - `InsufficientData` if `bars.len() < left + right + 1`
pub fn find_pivots(
    bars: &[Bar],
    left: usize,
    right: usize,
    kind: PivotKind,
) -> Result<Vec<Option<f64>>> {
    let values: Vec<f64> = bars.iter().map(|b| b.field(kind.field())).collect();
    find_pivots_in(&values, left, right, kind)
}

/// [`find_pivots`] over a raw series.
pub fn find_pivots_in(
    values: &[f64],
    left: usize,
    right: usize,
    kind: PivotKind,
) -> Result<Vec<Option<f64>>> {
    let params = PivotParams { left, right };
    params.validate()?;
    if values.len() < params.min_rows() {
        return Err(SignalError::InsufficientData {
            required: params.min_rows(),
            actual: values.len(),
        });
    }

    let n = values.len();
    let mut pivots = vec![None; n];
    for i in left..n - right {
        let candidate = values[i];
        let leading = &values[i - left..i];
        let trailing = &values[i + 1..=i + right];
        // NaN fails every comparison, so a void row is never a pivot and
        // never lets a neighbour qualify.
        if leading.iter().all(|&v| kind.beats_leading(candidate, v))
            && trailing.iter().all(|&v| kind.holds_trailing(candidate, v))
        {
            pivots[i] = Some(candidate);
        }
    }

    Ok(pivots)
}

/// Carry the last present value forward over absent rows.
///
/// Rows before the first present value stay absent. Applying the transform
/// twice gives the same result as applying it once.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .scan(None, |last: &mut Option<f64>, &v| {
            if v.is_some() {
                *last = v;
            }
            Some(*last)
        })
        .collect()
}
