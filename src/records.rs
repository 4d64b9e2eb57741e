//! Row shapes of the flat JSON exports.
//!
//! Every field in the export is a string. Deserialization is lenient: numbers,
//! booleans and `null` are turned into strings and missing fields become empty
//! strings, so a bad value surfaces later as a row-level import error instead of
//! failing the whole file.

use serde::{Deserialize, Deserializer, Serialize};

/// One setting (arrangement) of a tune.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTuneRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tune_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub setting_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub tune_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub meter: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mode: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub abc: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: String,
}

/// One (set, position, tune) membership row. Type/meter/mode/abc are
/// denormalized copies of the tune row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSetRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tuneset: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub member_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub settingorder: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tune_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub setting_id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub tune_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub meter: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mode: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub abc: String,
}

/// One (recording, track, tune) appearance. An empty `tune_id` means the
/// track content is not a known tune.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecordingRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recording: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub track: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tune: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tune_id: String,
}

/// One session venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSessionRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub town: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub area: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub latitude: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub longitude: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
}

/// Alternate title for a tune.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAliasRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tune_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub alias: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

/// How many personal tunebooks include a tune.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPopularityRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tune_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tunebooks: String,
}

/// The six raw arrays, already parsed from JSON.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub tunes: Vec<RawTuneRow>,
    pub sets: Vec<RawSetRow>,
    pub recordings: Vec<RawRecordingRow>,
    pub sessions: Vec<RawSessionRow>,
    pub aliases: Vec<RawAliasRow>,
    pub popularity: Vec<RawPopularityRow>,
}

/// Accept a string, number, bool or null and yield a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tune_row_deserialize() {
        let json = r#"{
            "tune_id": "1", "setting_id": "1", "name": "Cooley's", "type": "reel",
            "meter": "4/4", "mode": "Edorian", "abc": "|:D2|EBBA B2 EB|",
            "date": "2001-05-14 04:19:02", "username": "Jeremy"
        }"#;
        let row: RawTuneRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.tune_id, "1");
        assert_eq!(row.tune_type, "reel");
        assert_eq!(row.username, "Jeremy");
    }

    #[test]
    fn test_numbers_and_nulls_become_strings() {
        let json = r#"{"id": 42, "latitude": 53.27, "longitude": null, "name": "Crane Bar"}"#;
        let row: RawSessionRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, "42");
        assert_eq!(row.latitude, "53.27");
        assert_eq!(row.longitude, "");
        assert_eq!(row.town, "");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let row: RawRecordingRow = serde_json::from_str(r#"{"id": "7"}"#).unwrap();
        assert_eq!(row.id, "7");
        assert!(row.tune_id.is_empty());
    }
}
