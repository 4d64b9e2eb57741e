use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tunegraph::db::Database;
use tunegraph::models::EntityType;
use tunegraph::pipeline::{PipelineOptions, PipelineOutput, run};
use tunegraph::records::RawInputs;
use tunegraph::{export, loader};

fn write(dir: &Path, name: &str, value: Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

/// A small export in the `json/` layout. Ids are a mix of strings and
/// numbers, as in the real dumps.
fn write_fixture(root: &Path) {
    let dir = root.join("json");
    fs::create_dir_all(&dir).unwrap();

    write(&dir, loader::TUNES_FILE, json!([
        {"tune_id": "1", "setting_id": "10", "name": "Cooley's", "type": "reel", "meter": "4/4",
         "mode": "Edorian", "abc": "K:Edor\nEBBA B2 EB", "date": "2001-05-14 04:19:02", "username": "ann"},
        {"tune_id": 1, "setting_id": 11, "name": "Cooley's", "type": "reel", "meter": "4/4",
         "mode": "Edorian", "abc": "K:Gmaj\nM:6/8\nABC", "date": "2003-01-01 09:00:00", "username": "bob"},
        {"tune_id": "abc", "setting_id": "12", "name": "Broken", "type": "jig", "meter": "6/8",
         "mode": "Dmajor", "abc": "DFA", "date": "2003-01-01 09:00:00", "username": "ann"},
        {"tune_id": "2", "setting_id": "20", "name": "Kesh, The", "type": "jig", "meter": "6/8",
         "mode": "Gmajor", "abc": "", "date": "2002-02-02", "username": "cat"}
    ]));

    write(&dir, loader::SETS_FILE, json!([
        {"tuneset": "5", "date": "2004-04-04 12:00:00", "member_id": "7", "username": "dan",
         "settingorder": "3", "name": "Kesh, The", "tune_id": "2", "setting_id": "20", "type": "jig"},
        {"tuneset": "5", "date": "2004-04-04 12:00:00", "member_id": "7", "username": "dan",
         "settingorder": "1", "name": "Cooley's", "tune_id": "1", "setting_id": "10", "type": "reel"},
        {"tuneset": "5", "date": "2004-04-04 12:00:00", "member_id": "7", "username": "dan",
         "settingorder": "2", "name": "Unknown", "tune_id": "999", "setting_id": "1", "type": "reel"}
    ]));

    write(&dir, loader::RECORDINGS_FILE, json!([
        {"id": "40", "artist": "Altan", "recording": "Harvest Storm", "track": "1", "number": "1",
         "tune": "Cooley's", "tune_id": "1"},
        {"id": "40", "artist": "Altan", "recording": "Harvest Storm", "track": "1", "number": "2",
         "tune": "Kesh, The", "tune_id": "2"}
    ]));

    write(&dir, loader::SESSIONS_FILE, json!([
        {"id": "3", "name": "Crane Bar", "address": "2 Sea Road", "town": "Galway", "area": "",
         "country": "Ireland", "latitude": "53.27", "longitude": "-9.05", "date": "2005-01-01 00:00:00"},
        {"id": "4", "name": "Nowhere", "address": "", "town": "", "area": "", "country": "",
         "latitude": "not-a-number", "longitude": "0", "date": "2005-01-01 00:00:00"}
    ]));

    write(&dir, loader::ALIASES_FILE, json!([
        {"tune_id": "1", "alias": "Luttrell's Pass", "name": "Cooley's"},
        {"tune_id": "2", "alias": "Kesh Jig", "name": "Kesh, The"}
    ]));

    write(&dir, loader::POPULARITY_FILE, json!([
        {"tune_id": "2", "name": "Kesh, The", "tunebooks": "1500"}
    ]));
}

fn run_fixture(root: &Path) -> PipelineOutput {
    write_fixture(root);
    let inputs = loader::load_inputs(root).unwrap();
    run(&inputs, &PipelineOptions::default()).unwrap()
}

#[test]
fn test_end_to_end_collections() {
    let tmp = tempfile::tempdir().unwrap();
    let out = run_fixture(tmp.path());

    // Settings of one tune_id collapse into one tune
    let ids: Vec<i64> = out.tunes.iter().map(|t| t.tune.tune_id).collect();
    assert_eq!(ids, vec![1, 2]);
    let cooleys = &out.tunes[0].tune;
    let setting_ids: Vec<i64> = cooleys.settings.iter().map(|s| s.setting_id).collect();
    assert_eq!(setting_ids, vec![10, 11]);

    // Scenario with "ABC": intervals follow the fixed pitch table
    let abc = cooleys.settings[1].features.as_ref().unwrap();
    assert_eq!(abc.note_count, 3);
    assert_eq!(abc.key_signature, "Gmaj");
    assert_eq!(abc.time_signature, "6/8");
    assert_eq!(abc.intervals, vec![2, -11]);
    assert_eq!(abc.melodic_contour, vec![1, -1]);

    // Blank notation still gets the default fingerprint
    let blank = out.tunes[1].tune.settings[0].features.as_ref().unwrap();
    assert_eq!((blank.key_signature.as_str(), blank.time_signature.as_str()), ("C", "4/4"));
    assert_eq!(blank.note_count, 0);
    assert_eq!(out.tunes[1].tune.popularity, 1500);

    // Set compositions sorted by position, unknown tune kept
    assert_eq!(out.sets.len(), 1);
    let positions: Vec<i64> = out.sets[0]
        .compositions
        .iter()
        .map(|c| c.position_in_set)
        .collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert_eq!(out.set_links.unresolved.len(), 1);
    assert_eq!(out.set_links.unresolved[0].tune_id, 999);

    // One recording, one track, two tunes
    assert_eq!(out.recordings.len(), 1);
    assert_eq!(out.recordings[0].tracks.len(), 1);
    assert_eq!(out.recordings[0].tracks[0].tunes.len(), 2);
    assert!(out.recording_links.unresolved.is_empty());

    // Session with a bad coordinate is dropped
    assert_eq!(out.sessions.len(), 1);
    assert_eq!(out.sessions[0].session.full_address, "2 Sea Road, Galway, Ireland");
    assert_eq!(out.sessions[0].search_text, "crane bar galway  ireland");

    let names: Vec<&str> = out.users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["ann", "bob", "cat", "dan"]);
}

#[test]
fn test_errors_are_isolated_and_tagged() {
    let tmp = tempfile::tempdir().unwrap();
    let out = run_fixture(tmp.path());

    let stats = &out.stats;
    assert_eq!(stats.tunes_processed, 2);
    assert_eq!(stats.sessions_processed, 1);
    assert_eq!(stats.aliases_processed, 2);
    assert_eq!(stats.popularity_processed, 1);
    assert_eq!(stats.errors.len(), 2);

    let tune_err = stats
        .errors
        .iter()
        .find(|e| e.entity_type == EntityType::Tune)
        .unwrap();
    assert_eq!(tune_err.entity_id, "abc");
    assert_eq!(tune_err.raw["name"], "Broken");

    let by_type = stats.error_count_by_type();
    assert_eq!(by_type.get(&EntityType::Tune), Some(&1));
    assert_eq!(by_type.get(&EntityType::Session), Some(&1));
}

#[test]
fn test_every_alias_lands_on_its_tune() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());
    let inputs: RawInputs = loader::load_inputs(tmp.path()).unwrap();
    let out = run(&inputs, &PipelineOptions::default()).unwrap();

    for alias in &inputs.aliases {
        let id: i64 = alias.tune_id.parse().unwrap();
        let tune = out.tunes.iter().find(|t| t.tune.tune_id == id).unwrap();
        assert!(tune.tune.aliases.contains(&alias.alias));
        assert!(tune.search_text.contains(&alias.alias.to_lowercase()));
    }
}

#[test]
fn test_strict_links_reports_unknown_tunes() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());
    let inputs = loader::load_inputs(tmp.path()).unwrap();
    let out = run(&inputs, &PipelineOptions { strict_links: true, ..Default::default() }).unwrap();

    let set_errors: Vec<_> = out
        .stats
        .errors
        .iter()
        .filter(|e| e.entity_type == EntityType::Set)
        .collect();
    assert_eq!(set_errors.len(), 1);
    assert_eq!(set_errors[0].entity_id, "5");
    assert_eq!(set_errors[0].message, "references unknown tune 999");
}

#[test]
fn test_repeated_runs_are_identical() {
    let tmp = tempfile::tempdir().unwrap();
    write_fixture(tmp.path());
    let inputs = loader::load_inputs(tmp.path()).unwrap();

    let first = serde_json::to_string(&run(&inputs, &PipelineOptions::default()).unwrap()).unwrap();
    let second = serde_json::to_string(&run(&inputs, &PipelineOptions { workers: 3, ..Default::default() }).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_export_and_store() {
    let tmp = tempfile::tempdir().unwrap();
    let out = run_fixture(tmp.path());

    let out_dir = tmp.path().join("out");
    let written = export::write_json(&out_dir, &out).unwrap();
    assert_eq!(written.len(), 6);

    let sessions: Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("sessions.json")).unwrap()).unwrap();
    assert_eq!(sessions.as_array().unwrap().len(), 1);
    assert_eq!(sessions[0]["location"]["town"], "Galway");

    let db = Database::open(&tmp.path().join("db").join("tunegraph.db")).unwrap();
    db.store_output(&out).unwrap();

    let stats = db.stats().unwrap();
    assert_eq!(stats.tunes, 2);
    assert_eq!(stats.settings, 3);
    assert_eq!(stats.sets, 1);
    assert_eq!(stats.recordings, 1);
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.users, 4);
    assert_eq!(stats.import_errors, 2);

    let hits = db.search_tunes("kesh jig", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].tune_id, 2);
    assert_eq!(hits[0].popularity, 1500);

    let places = db.search_sessions("ireland", 5).unwrap();
    assert_eq!(places[0].name, "Crane Bar");
}
