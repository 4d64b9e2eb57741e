use super::{Normalized, OrderedIndex, RowError, parse_int, parse_timestamp};
use crate::models::{EntityType, ImportError, NormalizedTuneSet, SetComposition, TuneType};
use crate::records::RawSetRow;

/// Group membership rows into sets, ordered by position within each set.
pub fn normalize_sets(raw_sets: &[RawSetRow]) -> Normalized<NormalizedTuneSet> {
    let mut sets: OrderedIndex<i64, NormalizedTuneSet> = OrderedIndex::new();
    let mut errors = Vec::new();

    for row in raw_sets {
        let parsed = match parse_set_row(row) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping set row {:?}: {}", row.tuneset, e);
                errors.push(ImportError::new(EntityType::Set, &row.tuneset, e.to_string(), row));
                continue;
            }
        };

        let set = sets.get_or_insert_with(parsed.set_id, || NormalizedTuneSet {
            set_id: parsed.set_id,
            creator: row.username.clone(),
            created_at: parsed.created_at,
            is_public: true,
            compositions: Vec::new(),
        });

        set.compositions.push(SetComposition {
            set_id: parsed.set_id,
            tune_id: parsed.tune_id,
            setting_id: parsed.setting_id,
            position_in_set: parsed.position,
            name: row.name.clone(),
            tune_type: TuneType::from(row.tune_type.as_str()),
        });
    }

    // Stable: equal positions keep their input order
    for set in sets.values_mut() {
        set.compositions.sort_by_key(|c| c.position_in_set);
    }

    let items = sets.into_values();
    log::info!(
        "Normalized {} sets from {} rows ({} errors)",
        items.len(),
        raw_sets.len(),
        errors.len()
    );

    Normalized { items, errors }
}

struct ParsedSetRow {
    set_id: i64,
    position: i64,
    tune_id: i64,
    setting_id: i64,
    created_at: chrono::NaiveDateTime,
}

fn parse_set_row(row: &RawSetRow) -> Result<ParsedSetRow, RowError> {
    Ok(ParsedSetRow {
        set_id: parse_int("tuneset", &row.tuneset)?,
        position: parse_int("settingorder", &row.settingorder)?,
        tune_id: parse_int("tune_id", &row.tune_id)?,
        setting_id: parse_int("setting_id", &row.setting_id)?,
        created_at: parse_timestamp("date", &row.date)?,
    })
}
