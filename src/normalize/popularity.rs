use std::collections::HashMap;

use super::{Normalized, RowError, parse_int};
use crate::models::{EntityType, ImportError, NormalizedTune};
use crate::records::RawPopularityRow;

/// Copy tunebook counts onto already-normalized tunes.
///
/// Rows for tunes that were not normalized are skipped without an error; a
/// later row for the same tune overwrites an earlier one.
pub fn apply_popularity(
    tunes: &mut [NormalizedTune],
    raw_popularity: &[RawPopularityRow],
) -> Normalized<()> {
    let by_id: HashMap<i64, usize> = tunes
        .iter()
        .enumerate()
        .map(|(idx, t)| (t.tune_id, idx))
        .collect();

    let mut errors = Vec::new();
    let mut applied = 0usize;
    let mut unknown = 0usize;

    for row in raw_popularity {
        let (tune_id, count) = match parse_popularity_row(row) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping popularity row {:?}: {}", row.tune_id, e);
                errors.push(ImportError::new(EntityType::Popularity, &row.tune_id, e.to_string(), row));
                continue;
            }
        };

        match by_id.get(&tune_id) {
            Some(&idx) => {
                tunes[idx].popularity = count;
                applied += 1;
            }
            None => {
                log::debug!("Popularity row for unknown tune {tune_id}");
                unknown += 1;
            }
        }
    }

    log::info!("Applied popularity to {applied} tunes ({unknown} unknown, {} errors)", errors.len());

    Normalized {
        items: Vec::new(),
        errors,
    }
}

fn parse_popularity_row(row: &RawPopularityRow) -> Result<(i64, u32), RowError> {
    let tune_id = parse_int("tune_id", &row.tune_id)?;
    let count = parse_int("tunebooks", &row.tunebooks)?;
    let count = u32::try_from(count).map_err(|_| RowError::InvalidInteger {
        field: "tunebooks",
        value: row.tunebooks.clone(),
    })?;
    Ok((tune_id, count))
}
