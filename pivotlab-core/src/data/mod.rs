//! Bar ingestion and slicing.
//!
//! - `loader`: header-addressed CSV into a sorted `Vec<Bar>`
//! - `window`: date-range slices and fixed-length sliding windows

pub mod loader;
pub mod window;

pub use loader::{load_bars_csv, load_bars_path, parse_timestamp};
pub use window::{slice_date_range, sliding_windows};
