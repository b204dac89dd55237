//! Run fingerprinting: deterministic identification of inputs.
//!
//! - `ConfigHash`: BLAKE3 of the canonical JSON of a `PipelineConfig`.
//! - `DatasetHash`: BLAKE3 over the raw bar values, in order.
//! - `RunFingerprint`: both hashes plus the covered span, attached to every
//!   `SignalFrame`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Bar;
use crate::error::{Result, SignalError};

/// Hex BLAKE3 digest of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hex BLAKE3 digest of a bar sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialize with serde_json. Struct fields keep declaration order, so the
/// output is stable for a given type.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| SignalError::InvalidConfig(format!("canonical serialization: {e}")))
}

/// Hash timestamps and OHLCV values in row order.
pub fn dataset_hash(bars: &[Bar]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp_millis().to_le_bytes());
        for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    DatasetHash(hasher.finalize().to_hex().to_string())
}

/// Identity of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub bars: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
}

impl RunFingerprint {
    pub fn new(config_hash: ConfigHash, bars: &[Bar]) -> Self {
        Self {
            config_hash,
            dataset_hash: dataset_hash(bars),
            bars: bars.len(),
            first: bars.first().map(|b| b.timestamp),
            last: bars.last().map(|b| b.timestamp),
        }
    }
}
