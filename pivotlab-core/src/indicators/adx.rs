//! ADX: Average Directional Index (Wilder).
//!
//! 1. +DM / -DM from consecutive highs and lows
//! 2. Wilder-smooth +DM, -DM and true range over `period`
//! 3. +DI = 100 * sm(+DM) / sm(TR), -DI = 100 * sm(-DM) / sm(TR)
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period - 1 (DI seed on bar `period`, ADX seed `period - 1` bars later).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

/// True range per bar.
///
/// TR[0] = high - low (no previous close);
/// TR[t] = max(high-low, |high-close[t-1]|, |low-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let hl = bar.high - bar.low;
        let value = match i.checked_sub(1).map(|p| bars[p].close) {
            None => hl,
            Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        };
        // f64::max ignores NaN operands, so propagate explicitly.
        let any_nan = bar.high.is_nan()
            || bar.low.is_nan()
            || (i > 0 && bars[i - 1].close.is_nan());
        tr.push(if any_nan { f64::NAN } else { value });
    }
    tr
}

/// Wilder smoothing (alpha = 1/period).
///
/// Seeds with the mean of the first run of `period` consecutive non-NaN values;
/// a NaN after the seed ends the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    let Some(seed_start) =
        (0..=n - period).find(|&s| values[s..s + period].iter().all(|v| !v.is_nan()))
    else {
        return result;
    };

    let seed_end = seed_start + period;
    let mut prev = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    let alpha = 1.0 / period as f64;
    for i in seed_end..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }

    result
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        if n < 2 {
            return vec![f64::NAN; n];
        }

        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];
        for i in 1..n {
            let (cur, prev) = (&bars[i], &bars[i - 1]);
            let up = cur.high - prev.high;
            let down = prev.low - cur.low;
            if up.is_nan() || down.is_nan() {
                continue;
            }
            plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
            minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        }

        // Align TR with the DM series, which has no value on bar 0.
        let mut tr = true_range(bars);
        tr[0] = f64::NAN;

        let sm_tr = wilder_smooth(&tr, self.period);
        let sm_plus = wilder_smooth(&plus_dm, self.period);
        let sm_minus = wilder_smooth(&minus_dm, self.period);

        let dx: Vec<f64> = (0..n)
            .map(|i| {
                if sm_tr[i].is_nan() || sm_plus[i].is_nan() || sm_minus[i].is_nan() {
                    return f64::NAN;
                }
                if sm_tr[i] == 0.0 {
                    return 0.0;
                }
                let plus_di = 100.0 * sm_plus[i] / sm_tr[i];
                let minus_di = 100.0 * sm_minus[i] / sm_tr[i];
                let di_sum = plus_di + minus_di;
                if di_sum == 0.0 {
                    0.0
                } else {
                    100.0 * (plus_di - minus_di).abs() / di_sum
                }
            })
            .collect();

        wilder_smooth(&dx, self.period)
    }
}
