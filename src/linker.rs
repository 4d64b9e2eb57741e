//! Reference checks from sets and recordings to tunes.
//!
//! The association already exists through the embedded `tune_id` fields, so a
//! resolved reference needs no action. Unresolved ones are reported; turning
//! them into import errors is the caller's choice.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{
    EntityType, ImportError, NormalizedRecording, NormalizedTune, NormalizedTuneSet,
};

/// Tune lookup by id, built once per linking pass.
pub struct TuneLookup<'a> {
    by_id: HashMap<i64, &'a NormalizedTune>,
}

impl<'a> TuneLookup<'a> {
    pub fn new(tunes: &'a [NormalizedTune]) -> Self {
        Self {
            by_id: tunes.iter().map(|t| (t.tune_id, t)).collect(),
        }
    }

    pub fn get(&self, tune_id: i64) -> Option<&'a NormalizedTune> {
        self.by_id.get(&tune_id).copied()
    }
}

/// A set composition or track tune pointing at a tune id that was not
/// normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedReference {
    pub entity_type: EntityType,
    /// Set id or recording id.
    pub entity_id: i64,
    pub tune_id: i64,
}

impl UnresolvedReference {
    pub fn to_import_error(&self) -> ImportError {
        ImportError::new(
            self.entity_type,
            self.entity_id.to_string(),
            format!("references unknown tune {}", self.tune_id),
            self,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkReport {
    pub checked: usize,
    pub resolved: usize,
    pub unresolved: Vec<UnresolvedReference>,
}

/// Check every composition of every set against `lookup`.
pub fn link_sets_to_tunes(sets: &[NormalizedTuneSet], lookup: &TuneLookup<'_>) -> LinkReport {
    let mut report = LinkReport::default();
    for set in sets {
        for comp in &set.compositions {
            check(&mut report, lookup, EntityType::Set, set.set_id, comp.tune_id);
        }
    }
    log_report("sets", &report);
    report
}

/// Check every track tune of every recording against `lookup`.
pub fn link_recordings_to_tunes(
    recordings: &[NormalizedRecording],
    lookup: &TuneLookup<'_>,
) -> LinkReport {
    let mut report = LinkReport::default();
    for recording in recordings {
        for tune in recording.tracks.iter().flat_map(|t| &t.tunes) {
            check(
                &mut report,
                lookup,
                EntityType::Recording,
                recording.recording_id,
                tune.tune_id,
            );
        }
    }
    log_report("recordings", &report);
    report
}

fn check(
    report: &mut LinkReport,
    lookup: &TuneLookup<'_>,
    entity_type: EntityType,
    entity_id: i64,
    tune_id: i64,
) {
    report.checked += 1;
    if lookup.get(tune_id).is_some() {
        report.resolved += 1;
    } else {
        log::debug!("{entity_type} {entity_id} references unknown tune {tune_id}");
        report.unresolved.push(UnresolvedReference {
            entity_type,
            entity_id,
            tune_id,
        });
    }
}

fn log_report(what: &str, report: &LinkReport) {
    if report.unresolved.is_empty() {
        log::info!("Linked {what}: {} references, all resolved", report.checked);
    } else {
        log::warn!(
            "Linked {what}: {} of {} references point at unknown tunes",
            report.unresolved.len(),
            report.checked
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordingTrack, SetComposition, TrackTune, TuneType};
    use chrono::NaiveDateTime;

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2001-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn tune(id: i64) -> NormalizedTune {
        NormalizedTune {
            tune_id: id,
            name: format!("Tune {id}"),
            tune_type: TuneType::Reel,
            meter: "4/4".into(),
            mode: "Dmajor".into(),
            created_at: ts(),
            aliases: vec![],
            popularity: 0,
            settings: vec![],
        }
    }

    fn set(set_id: i64, tune_ids: &[i64]) -> NormalizedTuneSet {
        NormalizedTuneSet {
            set_id,
            creator: "x".into(),
            created_at: ts(),
            is_public: true,
            compositions: tune_ids
                .iter()
                .enumerate()
                .map(|(i, &tune_id)| SetComposition {
                    set_id,
                    tune_id,
                    setting_id: tune_id,
                    position_in_set: i as i64 + 1,
                    name: String::new(),
                    tune_type: TuneType::Reel,
                })
                .collect(),
        }
    }

    #[test]
    fn test_sets_resolved_and_unresolved() {
        let tunes = vec![tune(1), tune(2)];
        let lookup = TuneLookup::new(&tunes);
        let report = link_sets_to_tunes(&[set(10, &[1, 2]), set(11, &[2, 3])], &lookup);
        assert_eq!(report.checked, 4);
        assert_eq!(report.resolved, 3);
        assert_eq!(
            report.unresolved,
            vec![UnresolvedReference { entity_type: EntityType::Set, entity_id: 11, tune_id: 3 }]
        );
    }

    #[test]
    fn test_recordings_unresolved() {
        let tunes = vec![tune(1)];
        let lookup = TuneLookup::new(&tunes);
        let rec = NormalizedRecording {
            recording_id: 5,
            album: "A".into(),
            artist: "B".into(),
            artist_id: 1,
            tracks: vec![RecordingTrack {
                track_id: 51,
                track_number: 1,
                name: "Track 1".into(),
                tunes: vec![
                    TrackTune { tune_id: 1, name: "x".into(), position: 1 },
                    TrackTune { tune_id: 4, name: "y".into(), position: 2 },
                ],
            }],
        };
        let report = link_recordings_to_tunes(&[rec], &lookup);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.unresolved.len(), 1);

        let err = report.unresolved[0].to_import_error();
        assert_eq!(err.entity_type, EntityType::Recording);
        assert_eq!(err.entity_id, "5");
        assert_eq!(err.message, "references unknown tune 4");
        assert_eq!(err.raw["tune_id"], 4);
    }

    #[test]
    fn test_empty_inputs() {
        let lookup = TuneLookup::new(&[]);
        assert_eq!(link_sets_to_tunes(&[], &lookup), LinkReport::default());
    }
}
