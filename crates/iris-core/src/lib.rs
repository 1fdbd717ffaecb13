//! Foundational time utilities shared across iris crates.
//!
//! Provides unix timestamp helpers, lenient upstream timestamp parsing, and
//! calendar-date formatting used by the analytics pipeline and gateway.

pub mod time_utils;

pub use time_utils::{
    current_unix_timestamp, current_unix_timestamp_ms, parse_started_at, short_date_label,
    utc_iso_date,
};
