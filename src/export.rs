//! Write a run's collections as pretty-printed JSON files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::PipelineOutput;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error for {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Write every collection plus the stats into `dir`. Returns the paths written.
pub fn write_json(dir: &Path, output: &PipelineOutput) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let written = vec![
        write_file(dir, "tunes.json", &output.tunes)?,
        write_file(dir, "sets.json", &output.sets)?,
        write_file(dir, "recordings.json", &output.recordings)?,
        write_file(dir, "sessions.json", &output.sessions)?,
        write_file(dir, "users.json", &output.users)?,
        write_file(dir, "import_stats.json", &output.stats)?,
    ];

    log::info!("Wrote {} JSON files to {}", written.len(), dir.display());
    Ok(written)
}

fn write_file<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, ExportError> {
    let path = dir.join(name);
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = File::create(&path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ExportError::Json {
        path: path.display().to_string(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    Ok(path)
}
