use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Tune style. Unrecognized source values are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TuneType {
    Jig,
    Reel,
    SlipJig,
    Hornpipe,
    Polka,
    Slide,
    Waltz,
    Barndance,
    Strathspey,
    ThreeTwo,
    Mazurka,
    March,
    Other(String),
}

impl TuneType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jig => "jig",
            Self::Reel => "reel",
            Self::SlipJig => "slip jig",
            Self::Hornpipe => "hornpipe",
            Self::Polka => "polka",
            Self::Slide => "slide",
            Self::Waltz => "waltz",
            Self::Barndance => "barndance",
            Self::Strathspey => "strathspey",
            Self::ThreeTwo => "three-two",
            Self::Mazurka => "mazurka",
            Self::March => "march",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for TuneType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "jig" => Self::Jig,
            "reel" => Self::Reel,
            "slip jig" | "slip-jig" => Self::SlipJig,
            "hornpipe" => Self::Hornpipe,
            "polka" => Self::Polka,
            "slide" => Self::Slide,
            "waltz" => Self::Waltz,
            "barndance" | "barn dance" => Self::Barndance,
            "strathspey" => Self::Strathspey,
            "three-two" | "three two" => Self::ThreeTwo,
            "mazurka" => Self::Mazurka,
            "march" => Self::March,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for TuneType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<TuneType> for String {
    fn from(t: TuneType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for TuneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Descriptors derived from a setting's notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicalFeatures {
    pub key_signature: String,
    pub time_signature: String,
    pub note_count: usize,
    /// Sign of each interval: -1, 0 or 1.
    pub melodic_contour: Vec<i8>,
    /// Signed semitone deltas between consecutive notes.
    pub intervals: Vec<i32>,
    pub rhythmic_pattern: String,
}

/// One contributed arrangement of a tune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSetting {
    pub setting_id: i64,
    pub tune_id: i64,
    pub abc: String,
    pub contributor: String,
    pub created_at: NaiveDateTime,
    /// Filled by the feature sweep for every emitted setting.
    pub features: Option<MusicalFeatures>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTune {
    pub tune_id: i64,
    pub name: String,
    pub tune_type: TuneType,
    pub meter: String,
    pub mode: String,
    /// Creation time of the first-seen setting.
    pub created_at: NaiveDateTime,
    pub aliases: Vec<String>,
    pub popularity: u32,
    pub settings: Vec<NormalizedSetting>,
}

/// One (tune, position) entry of a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetComposition {
    pub set_id: i64,
    pub tune_id: i64,
    pub setting_id: i64,
    pub position_in_set: i64,
    pub name: String,
    pub tune_type: TuneType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTuneSet {
    pub set_id: i64,
    pub creator: String,
    pub created_at: NaiveDateTime,
    pub is_public: bool,
    /// Sorted ascending by `position_in_set`.
    pub compositions: Vec<SetComposition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackTune {
    pub tune_id: i64,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingTrack {
    /// Recording id digits followed by track number digits. Not globally unique.
    pub track_id: i64,
    pub track_number: i64,
    pub name: String,
    pub tunes: Vec<TrackTune>,
}

/// An album by one artist, collapsed from its track rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecording {
    pub recording_id: i64,
    pub album: String,
    pub artist: String,
    pub artist_id: i64,
    pub tracks: Vec<RecordingTrack>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub town: String,
    pub area: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSession {
    pub session_id: i64,
    pub name: String,
    pub full_address: String,
    pub location: Location,
    pub created_at: NaiveDateTime,
    pub is_active: bool,
}

/// A contributor or set creator seen during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
}

/// Which input family an import error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Tune,
    Set,
    Recording,
    Session,
    Alias,
    Popularity,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tune => "tune",
            Self::Set => "set",
            Self::Recording => "recording",
            Self::Session => "session",
            Self::Alias => "alias",
            Self::Popularity => "popularity",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A recovered per-row failure, with a copy of the offending record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportError {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub message: String,
    pub raw: serde_json::Value,
}

impl ImportError {
    pub fn new<R: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
        raw: &R,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            message: message.into(),
            raw: serde_json::to_value(raw).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Summary of one pipeline run. A run that returns is successful even when
/// `errors` is non-empty; callers judge data quality from the error list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    pub tunes_processed: usize,
    pub sets_processed: usize,
    pub recordings_processed: usize,
    pub sessions_processed: usize,
    pub aliases_processed: usize,
    pub popularity_processed: usize,
    pub errors: Vec<ImportError>,
}

impl ImportStats {
    pub fn error_count_by_type(&self) -> BTreeMap<EntityType, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.errors {
            *counts.entry(e.entity_type).or_insert(0) += 1;
        }
        counts
    }
}
