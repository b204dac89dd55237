//! Simple Moving Average (SMA).
//!
//! Rolling mean over a trailing window of any per-bar field.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::{Bar, PriceField};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: PriceField,
    name: String,
}

impl Sma {
    /// SMA of close prices.
    pub fn new(period: usize) -> Self {
        Self::of(PriceField::Close, period)
    }

    /// SMA of an arbitrary bar field (volume, range, ...).
    pub fn of(source: PriceField, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        let name = match source {
            PriceField::Close => format!("sma_{period}"),
            other => format!("sma_{}_{period}", other.as_str()),
        };
        Self {
            period,
            source,
            name,
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let values: Vec<f64> = bars.iter().map(|b| b.field(self.source)).collect();
        sma_of_series(&values, self.period)
    }
}

/// Trailing simple moving average of a raw series.
///
/// The first `period - 1` values are NaN. Any NaN inside a window makes that
/// window's mean NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    // Running sum plus a count of NaNs currently inside the window, so a NaN
    // never poisons the sum after it leaves.
    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &entering) in values.iter().enumerate() {
        if entering.is_nan() {
            nan_count += 1;
        } else {
            sum += entering;
        }

        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }

        if i + 1 >= period && nan_count == 0 {
            result[i] = sum / period as f64;
        }
    }

    result
}
