pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.migrate()?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if version < 1 {
            self.migrate_v1()?;
        }

        self.conn.pragma_update(None, "user_version", 1)?;
        Ok(())
    }

    /// V1: normalized catalog + search projections + import errors.
    ///
    /// Compositions and track tunes carry a plain `tune_id` without a foreign
    /// key: references to tunes outside the export are legal.
    fn migrate_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                user_id     INTEGER PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS tunes (
                tune_id     INTEGER PRIMARY KEY,
                name        TEXT NOT NULL,
                tune_type   TEXT NOT NULL,
                meter       TEXT NOT NULL,
                mode        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                popularity  INTEGER NOT NULL DEFAULT 0,
                search_text TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tunes_type ON tunes(tune_type);
            CREATE INDEX IF NOT EXISTS idx_tunes_popularity ON tunes(popularity);

            CREATE TABLE IF NOT EXISTS tune_aliases (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                tune_id     INTEGER NOT NULL REFERENCES tunes(tune_id) ON DELETE CASCADE,
                alias       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_aliases_tune ON tune_aliases(tune_id);

            -- Duplicate setting ids within a tune are kept, hence the surrogate key
            CREATE TABLE IF NOT EXISTS settings (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                setting_id          INTEGER NOT NULL,
                tune_id             INTEGER NOT NULL REFERENCES tunes(tune_id) ON DELETE CASCADE,
                abc                 TEXT NOT NULL,
                contributor         TEXT NOT NULL,
                created_at          TEXT NOT NULL,

                -- Musical features
                key_signature       TEXT,
                time_signature      TEXT,
                note_count          INTEGER,
                melodic_contour     TEXT, -- JSON [i8]
                intervals           TEXT, -- JSON [i32]
                rhythmic_pattern    TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_settings_tune ON settings(tune_id);
            CREATE INDEX IF NOT EXISTS idx_settings_key ON settings(key_signature);

            CREATE TABLE IF NOT EXISTS tune_sets (
                set_id      INTEGER PRIMARY KEY,
                creator     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                is_public   INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS set_compositions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                set_id          INTEGER NOT NULL REFERENCES tune_sets(set_id) ON DELETE CASCADE,
                tune_id         INTEGER NOT NULL,
                setting_id      INTEGER NOT NULL,
                position_in_set INTEGER NOT NULL,
                name            TEXT NOT NULL,
                tune_type       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_compositions_set ON set_compositions(set_id);
            CREATE INDEX IF NOT EXISTS idx_compositions_tune ON set_compositions(tune_id);

            CREATE TABLE IF NOT EXISTS artists (
                artist_id   INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE
            );

            -- Source row ids are not guaranteed unique across albums
            CREATE TABLE IF NOT EXISTS recordings (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                recording_id    INTEGER NOT NULL,
                album           TEXT NOT NULL,
                artist_id       INTEGER NOT NULL REFERENCES artists(artist_id)
            );
            CREATE INDEX IF NOT EXISTS idx_recordings_artist ON recordings(artist_id);

            CREATE TABLE IF NOT EXISTS recording_tracks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                recording_row   INTEGER NOT NULL REFERENCES recordings(id) ON DELETE CASCADE,
                track_id        INTEGER NOT NULL,
                track_number    INTEGER NOT NULL,
                name            TEXT NOT NULL,
                UNIQUE(recording_row, track_number)
            );

            CREATE TABLE IF NOT EXISTS track_tunes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                track_row   INTEGER NOT NULL REFERENCES recording_tracks(id) ON DELETE CASCADE,
                tune_id     INTEGER NOT NULL,
                name        TEXT NOT NULL,
                position    INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_track_tunes_tune ON track_tunes(tune_id);

            CREATE TABLE IF NOT EXISTS sessions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id      INTEGER NOT NULL,
                name            TEXT NOT NULL,
                full_address    TEXT NOT NULL,
                town            TEXT NOT NULL,
                area            TEXT NOT NULL,
                country         TEXT NOT NULL,
                latitude        REAL NOT NULL,
                longitude       REAL NOT NULL,
                created_at      TEXT NOT NULL,
                is_active       INTEGER NOT NULL,
                search_text     TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_session ON sessions(session_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_country ON sessions(country);

            CREATE TABLE IF NOT EXISTS import_errors (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_type TEXT NOT NULL,
                entity_id   TEXT NOT NULL,
                message     TEXT NOT NULL,
                raw         TEXT NOT NULL, -- JSON copy of the source row
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_import_errors_type ON import_errors(entity_type);
            ",
        )?;
        Ok(())
    }
}
