//! Domain types: the bar record and column views over a bar sequence.

pub mod bar;
pub mod columns;

pub use bar::{Bar, PriceField};
pub use columns::OhlcvColumns;
