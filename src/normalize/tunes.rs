use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::ProgressBar;
use rayon::prelude::*;

use super::{Normalized, OrderedIndex, RowError, parse_int, parse_timestamp};
use crate::features;
use crate::models::{EntityType, ImportError, NormalizedSetting, NormalizedTune, TuneType};
use crate::records::{RawAliasRow, RawTuneRow};

/// A checkpoint is logged every this many settings during the feature sweep.
pub const FEATURE_CHECKPOINT: usize = 1000;

/// Group setting rows into tunes, attach aliases, and extract features.
pub fn normalize_tunes(
    raw_tunes: &[RawTuneRow],
    raw_aliases: &[RawAliasRow],
) -> Normalized<NormalizedTune> {
    normalize_tunes_with_progress(raw_tunes, raw_aliases, &ProgressBar::hidden())
}

/// Same as [`normalize_tunes`], reporting the feature sweep on `pb`.
///
/// The sweep runs on the current rayon pool. Grouping happens before it on
/// one thread, so the output order is the input order regardless of pool size.
pub fn normalize_tunes_with_progress(
    raw_tunes: &[RawTuneRow],
    raw_aliases: &[RawAliasRow],
    pb: &ProgressBar,
) -> Normalized<NormalizedTune> {
    let (alias_index, mut errors) = build_alias_index(raw_aliases);

    let mut tunes: OrderedIndex<i64, NormalizedTune> = OrderedIndex::new();

    for row in raw_tunes {
        let parsed = match parse_tune_row(row) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping tune row {:?}: {}", row.tune_id, e);
                errors.push(ImportError::new(EntityType::Tune, &row.tune_id, e.to_string(), row));
                continue;
            }
        };

        let tune = tunes.get_or_insert_with(parsed.tune_id, || NormalizedTune {
            tune_id: parsed.tune_id,
            name: row.name.clone(),
            tune_type: TuneType::from(row.tune_type.as_str()),
            meter: row.meter.clone(),
            mode: row.mode.clone(),
            created_at: parsed.created_at,
            aliases: alias_index.get(&parsed.tune_id).cloned().unwrap_or_default(),
            popularity: 0,
            settings: Vec::new(),
        });

        tune.settings.push(NormalizedSetting {
            setting_id: parsed.setting_id,
            tune_id: parsed.tune_id,
            abc: row.abc.clone(),
            contributor: row.username.clone(),
            created_at: parsed.created_at,
            features: None,
        });
    }

    let mut items = tunes.into_values();
    extract_all_features(&mut items, pb);

    log::info!(
        "Normalized {} tunes from {} rows ({} errors)",
        items.len(),
        raw_tunes.len(),
        errors.len()
    );

    Normalized { items, errors }
}

struct ParsedTuneRow {
    tune_id: i64,
    setting_id: i64,
    created_at: chrono::NaiveDateTime,
}

fn parse_tune_row(row: &RawTuneRow) -> Result<ParsedTuneRow, RowError> {
    Ok(ParsedTuneRow {
        tune_id: parse_int("tune_id", &row.tune_id)?,
        setting_id: parse_int("setting_id", &row.setting_id)?,
        created_at: parse_timestamp("date", &row.date)?,
    })
}

/// Aliases by tune id, in row order. Duplicates in the source are kept.
fn build_alias_index(
    raw_aliases: &[RawAliasRow],
) -> (OrderedIndex<i64, Vec<String>>, Vec<ImportError>) {
    let mut index: OrderedIndex<i64, Vec<String>> = OrderedIndex::new();
    let mut errors = Vec::new();

    for row in raw_aliases {
        match parse_int("tune_id", &row.tune_id) {
            Ok(tune_id) => index.get_or_insert_with(tune_id, Vec::new).push(row.alias.clone()),
            Err(e) => {
                log::warn!("Skipping alias row {:?}: {}", row.tune_id, e);
                errors.push(ImportError::new(EntityType::Alias, &row.tune_id, e.to_string(), row));
            }
        }
    }

    (index, errors)
}

/// Fill in `features` for every setting. Element order is untouched.
fn extract_all_features(tunes: &mut [NormalizedTune], pb: &ProgressBar) {
    let mut settings: Vec<&mut NormalizedSetting> =
        tunes.iter_mut().flat_map(|t| t.settings.iter_mut()).collect();

    let total = settings.len();
    pb.set_length(total as u64);
    pb.set_message("Extracting features...");

    let done = AtomicUsize::new(0);
    settings.par_iter_mut().for_each(|setting| {
        setting.features = Some(features::extract(&setting.abc));
        pb.inc(1);
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        if n % FEATURE_CHECKPOINT == 0 {
            log::info!("Feature extraction checkpoint: {n}/{total} settings");
        }
    });

    pb.finish_with_message(format!("Features extracted for {total} settings"));
}
