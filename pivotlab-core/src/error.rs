//! Error taxonomy for the signal engine.
//!
//! Every precondition is checked at the start of the offending operation, so a
//! returned error always means no derived column was produced.

use thiserror::Error;

/// Errors raised by pivot extraction, regime classification, the rule engine,
/// the pipeline and the bar loaders.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("invalid window '{name}': {value} (must be a positive integer)")]
    InvalidWindow { name: &'static str, value: usize },

    #[error("insufficient data: {required} rows required, {actual} available")]
    InsufficientData { required: usize, actual: usize },

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unparseable timestamp '{value}' at row {row}")]
    Timestamp { row: usize, value: String },

    #[error("no bars between {start} and {end}")]
    EmptyRange { start: String, end: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SignalError>;

/// Reject a zero-sized window.
pub(crate) fn require_window(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(SignalError::InvalidWindow { name, value });
    }
    Ok(())
}

/// Reject a derived column whose length differs from the bar count.
pub(crate) fn require_len(column: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SignalError::LengthMismatch {
            column,
            expected,
            actual,
        });
    }
    Ok(())
}
