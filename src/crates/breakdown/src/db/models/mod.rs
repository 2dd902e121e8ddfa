//! Database row models

pub mod breakdown;

pub use breakdown::{format_timestamp, parse_timestamp, BreakdownRow};
