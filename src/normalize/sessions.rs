use regex::Regex;
use std::sync::LazyLock;

use super::{Normalized, RowError, parse_int, parse_timestamp};
use crate::models::{EntityType, ImportError, Location, NormalizedSession};
use crate::records::RawSessionRow;

// A comma followed by whitespace-separated commas, left by empty address parts
static REPEATED_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",(?:\s*,)+").unwrap()
});

/// Map venue rows to sessions. Rows that fail coercion are dropped entirely.
pub fn normalize_sessions(raw_sessions: &[RawSessionRow]) -> Normalized<NormalizedSession> {
    let mut items = Vec::with_capacity(raw_sessions.len());
    let mut errors = Vec::new();

    for row in raw_sessions {
        match normalize_session(row) {
            Ok(session) => items.push(session),
            Err(e) => {
                log::warn!("Skipping session {:?}: {}", row.id, e);
                errors.push(ImportError::new(EntityType::Session, &row.id, e.to_string(), row));
            }
        }
    }

    log::info!(
        "Normalized {} sessions from {} rows ({} errors)",
        items.len(),
        raw_sessions.len(),
        errors.len()
    );

    Normalized { items, errors }
}

fn normalize_session(row: &RawSessionRow) -> Result<NormalizedSession, RowError> {
    Ok(NormalizedSession {
        session_id: parse_int("id", &row.id)?,
        name: row.name.clone(),
        full_address: full_address(row),
        location: Location {
            town: row.town.clone(),
            area: row.area.clone(),
            country: row.country.clone(),
            latitude: parse_coordinate("latitude", &row.latitude, 90.0)?,
            longitude: parse_coordinate("longitude", &row.longitude, 180.0)?,
        },
        created_at: parse_timestamp("date", &row.date)?,
        is_active: true,
    })
}

/// Address parts joined with ", ", with runs of empty parts collapsed.
pub fn full_address(row: &RawSessionRow) -> String {
    let joined = [
        row.address.as_str(),
        row.town.as_str(),
        row.area.as_str(),
        row.country.as_str(),
    ]
    .join(", ");
    REPEATED_COMMA_RE.replace_all(&joined, ",").into_owned()
}

fn parse_coordinate(field: &'static str, value: &str, limit: f64) -> Result<f64, RowError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
        .ok_or_else(|| RowError::InvalidCoordinate {
            field,
            value: value.to_string(),
        })
}
