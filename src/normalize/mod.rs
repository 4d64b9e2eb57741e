//! Flat rows → canonical entities.
//!
//! Each pass returns its entities together with the row errors it recovered
//! from; the orchestrator concatenates the error lists.

pub mod index;
pub mod popularity;
pub mod recordings;
pub mod sessions;
pub mod sets;
pub mod tunes;

pub use index::OrderedIndex;
pub use popularity::apply_popularity;
pub use recordings::normalize_recordings;
pub use sessions::normalize_sessions;
pub use sets::normalize_sets;
pub use tunes::{normalize_tunes, normalize_tunes_with_progress};

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::ImportError;

/// Why a single row could not be coerced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("invalid integer in {field}: {value:?}")]
    InvalidInteger { field: &'static str, value: String },
    #[error("invalid date in {field}: {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("invalid coordinate in {field}: {value:?}")]
    InvalidCoordinate { field: &'static str, value: String },
}

/// Entities from one pass plus the errors recovered along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub errors: Vec<ImportError>,
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Parse an integer id field. Surrounding whitespace is tolerated.
pub fn parse_int(field: &'static str, value: &str) -> Result<i64, RowError> {
    value.trim().parse().map_err(|_| RowError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

/// Export timestamps are `YYYY-MM-DD HH:MM:SS`. RFC 3339 and bare dates
/// (taken as midnight) are accepted too.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<NaiveDateTime, RowError> {
    let v = value.trim();
    NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(v).map(|dt| dt.naive_utc()))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| RowError::InvalidDate {
            field,
            value: value.to_string(),
        })
}
