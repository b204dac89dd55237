//! Relative Strength Index (RSI), Wilder smoothing.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss). Lookback: period.
//! A window with no gains and no losses reads 0, as TA-Lib's RSI does.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let period = self.period;
        let mut result = vec![f64::NAN; n];

        if n <= period {
            return result;
        }

        // (gain, loss) of each close-to-close move; index i is the move into bar i.
        let moves: Vec<Option<(f64, f64)>> = bars
            .windows(2)
            .map(|w| {
                let change = w[1].close - w[0].close;
                (!change.is_nan()).then(|| (change.max(0.0), (-change).max(0.0)))
            })
            .collect();

        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for mv in &moves[..period] {
            match mv {
                Some((gain, loss)) => {
                    avg_gain += gain;
                    avg_loss += loss;
                }
                None => return result,
            }
        }
        avg_gain /= period as f64;
        avg_loss /= period as f64;
        result[period] = rsi_from_averages(avg_gain, avg_loss);

        let p = period as f64;
        for (offset, mv) in moves[period..].iter().enumerate() {
            let Some((gain, loss)) = mv else {
                // A void close ends the series; later values stay NaN.
                break;
            };
            avg_gain = (avg_gain * (p - 1.0) + gain) / p;
            avg_loss = (avg_loss * (p - 1.0) + loss) / p;
            result[period + 1 + offset] = rsi_from_averages(avg_gain, avg_loss);
        }

        result
    }
}

/// 100 * gain / (gain + loss); 0 when both are zero.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let total = avg_gain + avg_loss;
    if total == 0.0 {
        0.0
    } else {
        100.0 * avg_gain / total
    }
}
