//! CSV bar loader.
//!
//! Columns are matched case-insensitively: `date` (or `timestamp`), `open`,
//! `high`, `low`, `close`, `volume`. Extra columns are ignored, and so is
//! `timestamp` when a `date` column is also present. Empty or
//! non-numeric price cells load as NaN, producing a void bar.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::domain::Bar;
use crate::error::{Result, SignalError};

const REQUIRED: [&str; 5] = ["open", "high", "low", "close", "volume"];
const DATE_COLUMNS: [&str; 2] = ["date", "timestamp"];

#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
}

/// Parse `%Y-%m-%d %H:%M:%S`, RFC 3339 (converted to UTC) or a bare
/// `%Y-%m-%d` (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Lowercase the headers and rename the chosen date column to `date`.
fn normalize_headers(headers: &StringRecord) -> Result<StringRecord> {
    let mut names: Vec<String> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
    let mut candidates = DATE_COLUMNS
        .iter()
        .filter_map(|c| names.iter().position(|h| h == c));
    let date_idx = candidates
        .next()
        .ok_or_else(|| SignalError::MissingColumn("date".into()))?;
    if candidates.next().is_some() {
        warn!("both date and timestamp columns present, reading '{}'", names[date_idx]);
    }
    names[date_idx] = "date".to_string();

    let normalized: StringRecord = names.into_iter().collect();
    if let Some(missing) = REQUIRED.iter().find(|c| !normalized.iter().any(|h| h == **c)) {
        return Err(SignalError::MissingColumn((*missing).to_string()));
    }
    Ok(normalized)
}

/// Read bars from CSV, sorted by timestamp. Rows sharing a timestamp keep the
/// first occurrence.
///
/// # Errors
/// - `MissingColumn` when a required header is absent
/// - `Timestamp` for an unparseable date (row index excludes the header)
/// - `Csv` for malformed CSV (ragged rows, I/O failures)
pub fn load_bars_csv<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = normalize_headers(rdr.headers()?)?;

    let mut bars = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let raw: RawRow = record?.deserialize(Some(&headers))?;
        let timestamp = parse_timestamp(&raw.date).ok_or_else(|| SignalError::Timestamp {
            row,
            value: raw.date.clone(),
        })?;
        bars.push(Bar {
            timestamp,
            open: raw.open.unwrap_or(f64::NAN),
            high: raw.high.unwrap_or(f64::NAN),
            low: raw.low.unwrap_or(f64::NAN),
            close: raw.close.unwrap_or(f64::NAN),
            volume: raw.volume.unwrap_or(f64::NAN),
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    if bars.len() < before {
        warn!("dropped {} rows with duplicate timestamps", before - bars.len());
    }
    debug!("loaded {} bars", bars.len());
    Ok(bars)
}

/// [`load_bars_csv`] from a file.
pub fn load_bars_path(path: &Path) -> Result<Vec<Bar>> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    load_bars_csv(file)
}
