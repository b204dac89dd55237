//! Bollinger Bands over the typical price `(high + low + close) / 3`.
//!
//! - Middle: SMA(typical, window)
//! - Upper / Lower: middle ± stds * sample stddev(typical, window)
//! - Percent: (close - lower) / (upper - lower)
//! - Width: (upper - lower) / middle
//!
//! Each output is a separate `Indicator` instance so the single-series trait
//! stays unchanged. Lookback: window - 1.

use super::Indicator;
use crate::domain::Bar;

/// Which Bollinger-derived series to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
    Percent,
    Width,
}

impl BollingerBand {
    pub const ALL: [BollingerBand; 5] = [
        BollingerBand::Lower,
        BollingerBand::Middle,
        BollingerBand::Upper,
        BollingerBand::Percent,
        BollingerBand::Width,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Self::Upper => "bb_upperband",
            Self::Middle => "bb_middleband",
            Self::Lower => "bb_lowerband",
            Self::Percent => "bb_percent",
            Self::Width => "bb_width",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: usize,
    stds: f64,
    band: BollingerBand,
}

impl Bollinger {
    pub fn new(window: usize, stds: f64, band: BollingerBand) -> Self {
        assert!(window >= 2, "Bollinger window must be >= 2 (sample stddev)");
        Self { window, stds, band }
    }

    /// Mean and sample standard deviation of the typical price over the window
    /// ending at `i`, or `None` if the window holds a NaN.
    fn window_stats(&self, typical: &[f64], i: usize) -> Option<(f64, f64)> {
        let window = &typical[i + 1 - self.window..=i];
        if window.iter().any(|v| v.is_nan()) {
            return None;
        }
        let n = self.window as f64;
        let mean = window.iter().sum::<f64>() / n;
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some((mean, var.sqrt()))
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        self.band.column()
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.window {
            return result;
        }

        let typical: Vec<f64> = bars.iter().map(Bar::typical_price).collect();
        for i in (self.window - 1)..n {
            let Some((mid, sd)) = self.window_stats(&typical, i) else {
                continue;
            };
            let upper = mid + self.stds * sd;
            let lower = mid - self.stds * sd;
            // Zero-width bands give ±inf/NaN for the ratios, left as computed.
            result[i] = match self.band {
                BollingerBand::Upper => upper,
                BollingerBand::Middle => mid,
                BollingerBand::Lower => lower,
                BollingerBand::Percent => (bars[i].close - lower) / (upper - lower),
                BollingerBand::Width => (upper - lower) / mid,
            };
        }

        result
    }
}
