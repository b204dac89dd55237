//! Column-oriented view of a bar sequence.
//!
//! Pattern detectors take aligned OHLC arrays rather than bar records, the same
//! shape a TA library consumes.

use crate::error::{Result, SignalError};

use super::Bar;

/// Aligned open/high/low/close/volume arrays, one entry per bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OhlcvColumns {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl OhlcvColumns {
    pub fn from_bars(bars: &[Bar]) -> Self {
        let mut cols = Self {
            open: Vec::with_capacity(bars.len()),
            high: Vec::with_capacity(bars.len()),
            low: Vec::with_capacity(bars.len()),
            close: Vec::with_capacity(bars.len()),
            volume: Vec::with_capacity(bars.len()),
        };
        for bar in bars {
            cols.open.push(bar.open);
            cols.high.push(bar.high);
            cols.low.push(bar.low);
            cols.close.push(bar.close);
            cols.volume.push(bar.volume);
        }
        cols
    }

    /// Build from named columns, e.g. a table read from disk.
    ///
    /// Fails with `MissingColumn` when one of the five series is absent and
    /// `LengthMismatch` when the series are not aligned.
    pub fn from_named<'a, I>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Vec<f64>)>,
    {
        let mut open = None;
        let mut high = None;
        let mut low = None;
        let mut close = None;
        let mut volume = None;
        for (name, values) in columns {
            match name.to_ascii_lowercase().as_str() {
                "open" => open = Some(values),
                "high" => high = Some(values),
                "low" => low = Some(values),
                "close" => close = Some(values),
                "volume" => volume = Some(values),
                _ => {}
            }
        }
        let take = |col: Option<Vec<f64>>, name: &str| {
            col.ok_or_else(|| SignalError::MissingColumn(name.to_string()))
        };
        let cols = Self {
            open: take(open, "open")?,
            high: take(high, "high")?,
            low: take(low, "low")?,
            close: take(close, "close")?,
            volume: take(volume, "volume")?,
        };
        let n = cols.open.len();
        crate::error::require_len("high", n, cols.high.len())?;
        crate::error::require_len("low", n, cols.low.len())?;
        crate::error::require_len("close", n, cols.close.len())?;
        crate::error::require_len("volume", n, cols.volume.len())?;
        Ok(cols)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
