//! Locate and parse the six JSON exports.
//!
//! Files are looked up in `<dir>/json/` first, then in `<dir>/`. Any failure
//! here is fatal for the run.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::records::RawInputs;

pub const TUNES_FILE: &str = "tunes.json";
pub const SETS_FILE: &str = "sets.json";
pub const RECORDINGS_FILE: &str = "recordings.json";
pub const SESSIONS_FILE: &str = "sessions.json";
pub const ALIASES_FILE: &str = "aliases.json";
pub const POPULARITY_FILE: &str = "tune_popularity.json";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Input file {name} not found in {dir} or {dir}/json")]
    NotFound { name: &'static str, dir: String },
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolve an input file, preferring the `json/` subdirectory.
pub fn resolve_input(dir: &Path, name: &'static str) -> Result<PathBuf, LoadError> {
    [dir.join("json").join(name), dir.join(name)]
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| LoadError::NotFound {
            name,
            dir: dir.display().to_string(),
        })
}

/// Load all six arrays from `dir`.
pub fn load_inputs(dir: &Path) -> Result<RawInputs, LoadError> {
    let inputs = RawInputs {
        tunes: load_array(dir, TUNES_FILE)?,
        sets: load_array(dir, SETS_FILE)?,
        recordings: load_array(dir, RECORDINGS_FILE)?,
        sessions: load_array(dir, SESSIONS_FILE)?,
        aliases: load_array(dir, ALIASES_FILE)?,
        popularity: load_array(dir, POPULARITY_FILE)?,
    };
    log::info!(
        "Loaded {} tune rows, {} set rows, {} recording rows, {} sessions, {} aliases, {} popularity rows",
        inputs.tunes.len(),
        inputs.sets.len(),
        inputs.recordings.len(),
        inputs.sessions.len(),
        inputs.aliases.len(),
        inputs.popularity.len()
    );
    Ok(inputs)
}

fn load_array<T: DeserializeOwned>(dir: &Path, name: &'static str) -> Result<Vec<T>, LoadError> {
    let path = resolve_input(dir, name)?;
    log::debug!("Reading {}", path.display());
    let file = File::open(&path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| LoadError::Json {
        path: path.display().to_string(),
        source,
    })
}
