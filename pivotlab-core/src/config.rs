//! Pipeline configuration, loadable from TOML.
//!
//! Every field has a default, so a partial file (or none) is valid:
//!
//! ```toml
//! [pivot]
//! left = 5
//!
//! [rules]
//! adx_min = 20.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{require_window, Result, SignalError};
use crate::fingerprint::{canonical_json, ConfigHash};
use crate::hawkeye::HawkeyeParams;
use crate::pivot::PivotParams;
use crate::signals::SignalRules;

/// RSI and ADX periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorParams {
    pub rsi_period: usize,
    pub adx_period: usize,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            adx_period: 14,
        }
    }
}

/// Parabolic SAR used as the exit trend stop. The step equals the initial
/// acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendStopParams {
    pub acceleration: f64,
    pub maximum: f64,
}

impl Default for TrendStopParams {
    fn default() -> Self {
        Self {
            acceleration: 0.02,
            maximum: 0.2,
        }
    }
}

/// Chart overlays returned next to the signals. They never feed the rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayParams {
    pub ema_periods: Vec<usize>,
    pub bollinger_window: usize,
    pub bollinger_stds: f64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            ema_periods: vec![34, 89, 200],
            bollinger_window: 20,
            bollinger_stds: 2.0,
        }
    }
}

/// Complete parameter set of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pivot: PivotParams,
    pub hawkeye: HawkeyeParams,
    pub oscillators: OscillatorParams,
    pub trend_stop: TrendStopParams,
    pub rules: SignalRules,
    pub overlays: OverlayParams,
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SignalError::InvalidConfig(format!("read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a config from a TOML string; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SignalError::InvalidConfig(format!("parse config TOML: {e}")))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SignalError::InvalidConfig(format!("serialize config: {e}")))
    }

    /// Check every window and threshold before any computation starts.
    pub fn validate(&self) -> Result<()> {
        self.pivot.validate()?;
        self.hawkeye.validate()?;
        require_window("oscillators.rsi_period", self.oscillators.rsi_period)?;
        require_window("oscillators.adx_period", self.oscillators.adx_period)?;

        let TrendStopParams {
            acceleration,
            maximum,
        } = self.trend_stop;
        if !(acceleration > 0.0 && acceleration <= maximum && maximum.is_finite()) {
            return Err(SignalError::InvalidConfig(format!(
                "trend_stop needs 0 < acceleration <= maximum, got {acceleration} and {maximum}"
            )));
        }

        self.rules.validate()?;

        for &period in &self.overlays.ema_periods {
            require_window("overlays.ema_periods", period)?;
        }
        if self.overlays.bollinger_window < 2 {
            return Err(SignalError::InvalidConfig(format!(
                "overlays.bollinger_window must be at least 2, got {}",
                self.overlays.bollinger_window
            )));
        }
        if !(self.overlays.bollinger_stds.is_finite() && self.overlays.bollinger_stds >= 0.0) {
            return Err(SignalError::InvalidConfig(format!(
                "overlays.bollinger_stds must be a non-negative number, got {}",
                self.overlays.bollinger_stds
            )));
        }
        Ok(())
    }

    /// BLAKE3 of the canonical JSON form. Equal configs hash equally.
    pub fn config_hash(&self) -> Result<ConfigHash> {
        Ok(ConfigHash::of_bytes(canonical_json(self)?.as_bytes()))
    }
}
