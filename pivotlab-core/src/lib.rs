//! PivotLab Core: pivot/volume/candlestick signal engine over OHLCV bars.
//!
//! This crate contains:
//! - Domain types (bars, column views)
//! - Pivot extraction and forward-fill
//! - Hawkeye volume-regime classification
//! - Candlestick detectors and their aggregation
//! - RSI, ADX, parabolic SAR and chart overlays
//! - The entry/exit rule engine and the pipeline that wires it all together
//! - CSV loading, date slicing and run fingerprints

pub mod candlestick;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod frame;
pub mod hawkeye;
pub mod indicators;
pub mod pipeline;
pub mod pivot;
pub mod signals;

pub use candlestick::{aggregate_patterns, PatternDetector, PatternRegistry, PatternSignal};
pub use config::PipelineConfig;
pub use domain::{Bar, OhlcvColumns};
pub use error::{Result, SignalError};
pub use frame::{SignalFrame, SignalRow};
pub use hawkeye::{classify_volume, VolumeRegime};
pub use pipeline::{run_pipeline, run_pipeline_with};
pub use pivot::{find_pivots, forward_fill, PivotKind};
pub use signals::{generate_signals, ExitTag, SignalColumns, SignalInputs, SignalRules};
