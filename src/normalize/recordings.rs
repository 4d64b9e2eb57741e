use super::{Normalized, OrderedIndex, RowError, parse_int};
use crate::models::{EntityType, ImportError, NormalizedRecording, RecordingTrack, TrackTune};
use crate::records::RawRecordingRow;

/// Collapse track rows into albums keyed by (artist, album).
///
/// Artist ids are handed out from 1 in first-seen order and are only stable
/// within one run.
pub fn normalize_recordings(raw_recordings: &[RawRecordingRow]) -> Normalized<NormalizedRecording> {
    let mut artists: OrderedIndex<String, i64> = OrderedIndex::new();
    let mut recordings: OrderedIndex<(String, String), NormalizedRecording> = OrderedIndex::new();
    let mut errors = Vec::new();

    for row in raw_recordings {
        let parsed = match parse_recording_row(row) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping recording row {:?}: {}", row.id, e);
                errors.push(ImportError::new(EntityType::Recording, &row.id, e.to_string(), row));
                continue;
            }
        };

        // The first row of an album decides its id, and the track id with it
        let recording_id = recordings
            .get(&(row.artist.clone(), row.recording.clone()))
            .map(|r| r.recording_id)
            .unwrap_or(parsed.row_id);
        let track_id = track_id(recording_id, parsed.track_number);

        let next_artist_id = artists.len() as i64 + 1;
        let artist_id = *artists.get_or_insert_with(row.artist.clone(), || next_artist_id);

        let recording = recordings.get_or_insert_with(
            (row.artist.clone(), row.recording.clone()),
            || NormalizedRecording {
                recording_id,
                album: row.recording.clone(),
                artist: row.artist.clone(),
                artist_id,
                tracks: Vec::new(),
            },
        );

        // Linear search: albums have few tracks
        let idx = match recording
            .tracks
            .iter()
            .position(|t| t.track_number == parsed.track_number)
        {
            Some(idx) => idx,
            None => {
                recording.tracks.push(RecordingTrack {
                    track_id,
                    track_number: parsed.track_number,
                    name: format!("Track {}", parsed.track_number),
                    tunes: Vec::new(),
                });
                recording.tracks.len() - 1
            }
        };

        if let Some((tune_id, position)) = parsed.tune {
            recording.tracks[idx].tunes.push(TrackTune {
                tune_id,
                name: row.tune.clone(),
                position,
            });
        }
    }

    let items = recordings.into_values();
    log::info!(
        "Normalized {} recordings by {} artists from {} rows ({} errors)",
        items.len(),
        artists.len(),
        raw_recordings.len(),
        errors.len()
    );

    Normalized { items, errors }
}

struct ParsedRecordingRow {
    row_id: i64,
    track_number: i64,
    /// (tune id, position), absent when the row has no tune id.
    tune: Option<(i64, i64)>,
}

fn parse_recording_row(row: &RawRecordingRow) -> Result<ParsedRecordingRow, RowError> {
    let row_id = parse_int("id", &row.id)?;
    let track_number = parse_int("track", &row.track)?;
    let tune = if row.tune_id.is_empty() {
        None
    } else {
        Some((parse_int("tune_id", &row.tune_id)?, parse_int("number", &row.number)?))
    };
    Ok(ParsedRecordingRow {
        row_id,
        track_number,
        tune,
    })
}

/// Decimal recording id followed by the digits of the track number, so
/// recording 12 track 3 is 123. The track number's sign is ignored. When the
/// result does not fit in an `i64` the track number alone is used.
fn track_id(recording_id: i64, track_number: i64) -> i64 {
    let digits = track_number.unsigned_abs();
    let scale = 10i64.checked_pow(digits.checked_ilog10().unwrap_or(0) + 1);
    let digits = i64::try_from(digits).ok();

    let joined = scale.zip(digits).and_then(|(scale, digits)| {
        let shifted = recording_id.checked_mul(scale)?;
        if recording_id < 0 {
            shifted.checked_sub(digits)
        } else {
            shifted.checked_add(digits)
        }
    });

    joined.unwrap_or_else(|| {
        log::warn!(
            "Track id for recording {recording_id} track {track_number} does not fit; using the track number"
        );
        track_number
    })
}
