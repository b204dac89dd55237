//! Hawkeye volume regimes: classifies each bar's volume-vs-range behaviour
//! into one of four mutually exclusive buckets.
//!
//! Per bar the classifier compares the current range, close and volume against
//! long averages and against the *previous* bar's midpoint and envelope
//! (`mid ± range / divisor`). The one-row lag is part of the indicator: a bar is
//! judged by how it breaks out of the prior bar's envelope.
//!
//! Branches are evaluated in [`VolumeRegime::EVALUATION_ORDER`]; the first one
//! that fires wins, so neutral beats both directional regimes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Bar;
use crate::error::{require_window, Result, SignalError};
use crate::indicators::sma_of_series;

/// Categorical volume regime of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeRegime {
    /// Gray: volume and range inside normal bounds.
    Neutral,
    /// Green: buying pressure.
    Bullish,
    /// Red: selling pressure.
    Bearish,
    /// Blue: default when no branch fires, and every warmup row.
    Base,
}

impl VolumeRegime {
    /// Precedence of the classifier. `Base` fires unconditionally, so the
    /// list always yields a regime.
    pub const EVALUATION_ORDER: [VolumeRegime; 4] = [
        VolumeRegime::Neutral,
        VolumeRegime::Bullish,
        VolumeRegime::Bearish,
        VolumeRegime::Base,
    ];

    /// Display color used by the volume histogram.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Neutral => "gray",
            Self::Bullish => "#3D9970",
            Self::Bearish => "#FF4136",
            Self::Base => "blue",
        }
    }

    /// Whether this regime's branch fires for `ctx`.
    pub fn fires(&self, ctx: &BarContext) -> bool {
        match self {
            Self::Neutral => ctx.neutral_branch(),
            Self::Bullish => ctx.bullish_branch(),
            Self::Bearish => ctx.bearish_branch(),
            Self::Base => true,
        }
    }

    /// First regime in evaluation order whose branch fires.
    pub fn classify(ctx: &BarContext) -> VolumeRegime {
        Self::EVALUATION_ORDER
            .into_iter()
            .find(|regime| regime.fires(ctx))
            .unwrap_or(VolumeRegime::Base)
    }
}

impl fmt::Display for VolumeRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Neutral => "neutral",
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Base => "base",
        };
        f.write_str(name)
    }
}

/// Everything one bar's branches read: current-bar values, long averages and
/// the previous bar's envelope. NaN inputs make the comparisons they touch
/// false.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarContext {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub range: f64,
    pub range_avg: f64,
    pub volume_ma_long: f64,
    pub prev_high: f64,
    pub prev_low: f64,
    pub prev_volume: f64,
    pub prev_mid: f64,
    pub prev_upper: f64,
    pub prev_lower: f64,
}

impl BarContext {
    fn wide_range(&self) -> bool {
        self.range > self.range_avg
    }

    fn narrow_range(&self) -> bool {
        self.range < self.range_avg / 1.5
    }

    fn inside_prev_envelope(&self) -> bool {
        self.prev_lower < self.close && self.close < self.prev_upper
    }

    pub fn bearish_branch(&self) -> bool {
        (self.wide_range() && self.close < self.prev_lower && self.volume > self.volume_ma_long)
            || self.close < self.prev_mid
    }

    pub fn bullish_branch(&self) -> bool {
        self.close > self.prev_mid
            || (self.wide_range()
                && self.close > self.prev_upper
                && self.volume > self.volume_ma_long)
            || (self.high > self.prev_high
                && self.narrow_range()
                && self.volume < self.volume_ma_long)
            || (self.low < self.prev_low
                && self.narrow_range()
                && self.volume > self.volume_ma_long)
    }

    pub fn neutral_branch(&self) -> bool {
        (self.wide_range()
            && self.inside_prev_envelope()
            && self.volume_ma_long < self.volume
            && self.volume < 1.5 * self.volume_ma_long
            && self.volume > self.prev_volume)
            || (self.narrow_range() && self.volume < self.volume_ma_long / 1.5)
            || self.inside_prev_envelope()
    }
}

/// Classifier windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HawkeyeParams {
    /// Window of the range average and the long volume average.
    pub range_window: usize,
    /// Window of the returned short volume average.
    pub vol_ma_window: usize,
    /// Envelope half-width is `range / divisor`.
    pub divisor: f64,
}

impl Default for HawkeyeParams {
    fn default() -> Self {
        Self {
            range_window: 200,
            vol_ma_window: 20,
            divisor: 3.6,
        }
    }
}

impl HawkeyeParams {
    pub fn validate(&self) -> Result<()> {
        require_window("hawkeye.range_window", self.range_window)?;
        require_window("hawkeye.vol_ma_window", self.vol_ma_window)?;
        if !(self.divisor.is_finite() && self.divisor > 0.0) {
            return Err(SignalError::InvalidConfig(format!(
                "hawkeye.divisor must be a positive number, got {}",
                self.divisor
            )));
        }
        Ok(())
    }

    /// Rows forced to `Base`: the averages are undefined there, and row 0 has
    /// no previous envelope.
    pub fn warmup(&self) -> usize {
        self.range_window.max(self.vol_ma_window).max(2) - 1
    }

    pub fn classify(&self, bars: &[Bar]) -> Result<HawkeyeOutput> {
        classify_volume(bars, self.range_window, self.vol_ma_window, self.divisor)
    }
}

/// Result of [`classify_volume`].
#[derive(Debug, Clone, PartialEq)]
pub struct HawkeyeOutput {
    /// SMA of volume over `vol_ma_window`.
    pub volume_avg: Vec<f64>,
    pub regime: Vec<VolumeRegime>,
}

/// Classify every bar into a [`VolumeRegime`] and return the short volume
/// average alongside.
///
/// # Errors
/// `InvalidWindow` for a zero window, `InvalidConfig` for a non-positive divisor.
pub fn classify_volume(
    bars: &[Bar],
    range_window: usize,
    vol_ma_window: usize,
    divisor: f64,
) -> Result<HawkeyeOutput> {
    let params = HawkeyeParams {
        range_window,
        vol_ma_window,
        divisor,
    };
    params.validate()?;

    let range: Vec<f64> = bars.iter().map(Bar::range).collect();
    let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let range_avg = sma_of_series(&range, range_window);
    let volume_avg = sma_of_series(&volume, vol_ma_window);
    let volume_ma_long = sma_of_series(&volume, range_window);

    let warmup = params.warmup();
    let regime = (0..bars.len())
        .map(|i| {
            if i < warmup {
                return VolumeRegime::Base;
            }
            let (bar, prev) = (&bars[i], &bars[i - 1]);
            let half_width = prev.range() / divisor;
            let ctx = BarContext {
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                range: range[i],
                range_avg: range_avg[i],
                volume_ma_long: volume_ma_long[i],
                prev_high: prev.high,
                prev_low: prev.low,
                prev_volume: prev.volume,
                prev_mid: prev.mid(),
                prev_upper: prev.mid() + half_width,
                prev_lower: prev.mid() - half_width,
            };
            VolumeRegime::classify(&ctx)
        })
        .collect();

    Ok(HawkeyeOutput { volume_avg, regime })
}
