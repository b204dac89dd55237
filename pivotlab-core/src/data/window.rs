//! Date-range slicing and sliding windows over sorted bars.

use chrono::NaiveDate;
use std::slice::Windows;

use crate::domain::Bar;
use crate::error::{require_window, Result, SignalError};

/// Bars dated within `[start, end]` (both inclusive, whole days), extended by
/// up to `prepare` earlier rows so windowed indicators are warm at `start`.
///
/// An open bound (`None`) keeps that side of the series. `bars` must be sorted.
///
/// # Errors
/// `EmptyRange` if no bar falls inside the range.
pub fn slice_date_range(
    bars: &[Bar],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    prepare: usize,
) -> Result<&[Bar]> {
    let first = start.map_or(0, |s| bars.partition_point(|b| b.timestamp.date() < s));
    let last = end.map_or(bars.len(), |e| bars.partition_point(|b| b.timestamp.date() <= e));
    if first >= last {
        let show = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        return Err(SignalError::EmptyRange {
            start: show(start),
            end: show(end),
        });
    }
    Ok(&bars[first.saturating_sub(prepare)..last])
}

/// Every contiguous run of `length` bars, advancing one row at a time.
///
/// # Errors
/// - `InvalidWindow` if `length` is zero
/// - `InsufficientData` if `length` exceeds the number of bars
pub fn sliding_windows(bars: &[Bar], length: usize) -> Result<Windows<'_, Bar>> {
    require_window("window length", length)?;
    if length > bars.len() {
        return Err(SignalError::InsufficientData {
            required: length,
            actual: bars.len(),
        });
    }
    Ok(bars.windows(length))
}
