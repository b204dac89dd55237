//! Rule thresholds and exit reasons.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SignalError};

/// Oscillator thresholds of the entry rules.
///
/// Entries need `adx > adx_min`; longs need `rsi <= rsi_long_max`, shorts
/// `rsi > rsi_short_min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalRules {
    pub adx_min: f64,
    pub rsi_long_max: f64,
    pub rsi_short_min: f64,
}

impl Default for SignalRules {
    fn default() -> Self {
        Self {
            adx_min: 25.0,
            rsi_long_max: 40.0,
            rsi_short_min: 60.0,
        }
    }
}

impl SignalRules {
    /// Thresholds must be finite, and the long RSI ceiling must sit below the
    /// short RSI floor so a single RSI value cannot satisfy both entries.
    pub fn validate(&self) -> Result<()> {
        let all_finite = [self.adx_min, self.rsi_long_max, self.rsi_short_min]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(SignalError::InvalidConfig(
                "rule thresholds must be finite".into(),
            ));
        }
        if self.rsi_long_max >= self.rsi_short_min {
            return Err(SignalError::InvalidConfig(format!(
                "rules.rsi_long_max ({}) must be below rules.rsi_short_min ({})",
                self.rsi_long_max, self.rsi_short_min
            )));
        }
        Ok(())
    }
}

/// Reason attached to an exit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitTag {
    #[serde(rename = "Exit Long - SAR")]
    LongSar,
    #[serde(rename = "Exit Short - SAR")]
    ShortSar,
}

impl ExitTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongSar => "Exit Long - SAR",
            Self::ShortSar => "Exit Short - SAR",
        }
    }
}

impl fmt::Display for ExitTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
