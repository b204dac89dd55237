//! Parabolic SAR: Wilder's stop-and-reverse, the trend stop behind the exit rules.
//!
//! Sequential: carries direction, extreme point (EP) and acceleration factor
//! (AF) from bar to bar. Lookback: 1 (the first stop is placed on bar 1).
//!
//! Matches TA-Lib `SAR`. The starting direction comes from the directional
//! movement of the first two bars; a bar touching the stop reverses the trend.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct ParabolicSar {
    af_start: f64,
    af_step: f64,
    af_max: f64,
    name: String,
}

impl ParabolicSar {
    pub fn new(af_start: f64, af_step: f64, af_max: f64) -> Self {
        assert!(af_start > 0.0, "AF start must be > 0");
        assert!(af_step > 0.0, "AF step must be > 0");
        assert!(af_max >= af_start, "AF max must be >= AF start");
        Self {
            af_start,
            af_step,
            af_max,
            name: "sar".to_string(),
        }
    }

    /// `SAR(acceleration, maximum)`: the factor starts at and grows by
    /// `acceleration`, capped at `maximum`.
    pub fn with_acceleration(acceleration: f64, maximum: f64) -> Self {
        Self::new(acceleration, acceleration, maximum)
    }

    /// 0.02 / 0.02 / 0.20
    pub fn default_params() -> Self {
        Self::new(0.02, 0.02, 0.20)
    }
}

#[derive(Debug, Clone, Copy)]
struct SarState {
    long: bool,
    /// Stop for the next bar.
    sar: f64,
    ep: f64,
    af: f64,
    prev_high: f64,
    prev_low: f64,
}

impl ParabolicSar {
    /// Emit the stop for `bar`, then project the stop for the following bar.
    ///
    /// Touching the stop reverses the trend. The reversed stop opens at the
    /// old extreme point, pushed outside the current and previous bar.
    fn step(&self, state: &mut SarState, bar: &Bar) -> f64 {
        let (prev_high, prev_low) = (state.prev_high, state.prev_low);
        state.prev_high = bar.high;
        state.prev_low = bar.low;

        if state.long {
            if bar.low <= state.sar {
                let stop = state.ep.max(prev_high).max(bar.high);
                state.long = false;
                state.af = self.af_start;
                state.ep = bar.low;
                state.sar = (stop + state.af * (state.ep - stop))
                    .max(prev_high)
                    .max(bar.high);
                return stop;
            }
            let stop = state.sar;
            if bar.high > state.ep {
                state.ep = bar.high;
                state.af = (state.af + self.af_step).min(self.af_max);
            }
            // Never above the last two lows.
            state.sar = (stop + state.af * (state.ep - stop))
                .min(prev_low)
                .min(bar.low);
            stop
        } else {
            if bar.high >= state.sar {
                let stop = state.ep.min(prev_low).min(bar.low);
                state.long = true;
                state.af = self.af_start;
                state.ep = bar.high;
                state.sar = (stop + state.af * (state.ep - stop))
                    .min(prev_low)
                    .min(bar.low);
                return stop;
            }
            let stop = state.sar;
            if bar.low < state.ep {
                state.ep = bar.low;
                state.af = (state.af + self.af_step).min(self.af_max);
            }
            // Never below the last two highs.
            state.sar = (stop + state.af * (state.ep - stop))
                .max(prev_high)
                .max(bar.high);
            stop
        }
    }
}

impl Indicator for ParabolicSar {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        let void = |b: &Bar| b.high.is_nan() || b.low.is_nan();
        if n < 2 || bars[..2].iter().any(void) {
            return result;
        }

        // Initial direction from the directional movement of bars 0 and 1:
        // short only when the down move is positive and dominates.
        let up_move = bars[1].high - bars[0].high;
        let down_move = bars[0].low - bars[1].low;
        let long = !(down_move > 0.0 && down_move > up_move);
        let (sar, ep) = if long {
            (bars[0].low, bars[1].high)
        } else {
            (bars[0].high, bars[1].low)
        };
        let mut state = SarState {
            long,
            sar,
            ep,
            af: self.af_start,
            prev_high: bars[1].high,
            prev_low: bars[1].low,
        };

        for i in 1..n {
            // Void bars emit nothing and leave the state untouched.
            if void(&bars[i]) {
                continue;
            }
            result[i] = self.step(&mut state, &bars[i]);
        }

        result
    }
}
