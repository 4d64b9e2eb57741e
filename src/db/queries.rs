use super::models::{CatalogStats, SessionHit, StoreSummary, TuneHit};
use super::{Database, Result};
use crate::models::MusicalFeatures;
use crate::pipeline::PipelineOutput;
use chrono::NaiveDateTime;
use rusqlite::params;

fn timestamp(t: &NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Lower-cased substring pattern for `LIKE ... ESCAPE '\'`, with the query's
/// own wildcards matched literally.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Database {
    /// Replace the stored catalog with one pipeline run, in a single transaction.
    pub fn store_output(&self, output: &PipelineOutput) -> Result<StoreSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let mut summary = StoreSummary::default();

        // Children first so the cascades have nothing left to do
        tx.execute_batch(
            "
            DELETE FROM track_tunes;
            DELETE FROM recording_tracks;
            DELETE FROM recordings;
            DELETE FROM artists;
            DELETE FROM set_compositions;
            DELETE FROM tune_sets;
            DELETE FROM settings;
            DELETE FROM tune_aliases;
            DELETE FROM tunes;
            DELETE FROM sessions;
            DELETE FROM users;
            DELETE FROM import_errors;
            ",
        )?;

        {
            let mut stmt = tx.prepare_cached("INSERT INTO users (user_id, username) VALUES (?1, ?2)")?;
            for u in &output.users {
                stmt.execute(params![u.user_id, u.username])?;
                summary.users += 1;
            }
        }

        {
            let mut tune_stmt = tx.prepare_cached(
                "INSERT INTO tunes (tune_id, name, tune_type, meter, mode, created_at, popularity, search_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut alias_stmt =
                tx.prepare_cached("INSERT INTO tune_aliases (tune_id, alias) VALUES (?1, ?2)")?;
            let mut setting_stmt = tx.prepare_cached(
                "INSERT INTO settings (
                    setting_id, tune_id, abc, contributor, created_at,
                    key_signature, time_signature, note_count, melodic_contour, intervals, rhythmic_pattern
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;

            for st in &output.tunes {
                let t = &st.tune;
                tune_stmt.execute(params![
                    t.tune_id,
                    t.name,
                    t.tune_type.as_str(),
                    t.meter,
                    t.mode,
                    timestamp(&t.created_at),
                    t.popularity,
                    st.search_text,
                ])?;
                summary.tunes += 1;

                for alias in &t.aliases {
                    alias_stmt.execute(params![t.tune_id, alias])?;
                }

                for s in &t.settings {
                    let f: Option<&MusicalFeatures> = s.features.as_ref();
                    let contour = f.map(|f| serde_json::to_string(&f.melodic_contour)).transpose()?;
                    let intervals = f.map(|f| serde_json::to_string(&f.intervals)).transpose()?;
                    setting_stmt.execute(params![
                        s.setting_id,
                        s.tune_id,
                        s.abc,
                        s.contributor,
                        timestamp(&s.created_at),
                        f.map(|f| f.key_signature.as_str()),
                        f.map(|f| f.time_signature.as_str()),
                        f.map(|f| f.note_count as i64),
                        contour,
                        intervals,
                        f.map(|f| f.rhythmic_pattern.as_str()),
                    ])?;
                    summary.settings += 1;
                }
            }
        }

        {
            let mut set_stmt = tx.prepare_cached(
                "INSERT INTO tune_sets (set_id, creator, created_at, is_public) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut comp_stmt = tx.prepare_cached(
                "INSERT INTO set_compositions (set_id, tune_id, setting_id, position_in_set, name, tune_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for set in &output.sets {
                set_stmt.execute(params![set.set_id, set.creator, timestamp(&set.created_at), set.is_public])?;
                summary.sets += 1;
                for c in &set.compositions {
                    comp_stmt.execute(params![
                        c.set_id,
                        c.tune_id,
                        c.setting_id,
                        c.position_in_set,
                        c.name,
                        c.tune_type.as_str(),
                    ])?;
                }
            }
        }

        {
            let mut artist_stmt =
                tx.prepare_cached("INSERT OR IGNORE INTO artists (artist_id, name) VALUES (?1, ?2)")?;
            let mut rec_stmt = tx.prepare_cached(
                "INSERT INTO recordings (recording_id, album, artist_id) VALUES (?1, ?2, ?3)",
            )?;
            let mut track_stmt = tx.prepare_cached(
                "INSERT INTO recording_tracks (recording_row, track_id, track_number, name)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut tune_stmt = tx.prepare_cached(
                "INSERT INTO track_tunes (track_row, tune_id, name, position) VALUES (?1, ?2, ?3, ?4)",
            )?;

            for r in &output.recordings {
                artist_stmt.execute(params![r.artist_id, r.artist])?;
                rec_stmt.execute(params![r.recording_id, r.album, r.artist_id])?;
                let recording_row = tx.last_insert_rowid();
                summary.recordings += 1;

                for track in &r.tracks {
                    track_stmt.execute(params![recording_row, track.track_id, track.track_number, track.name])?;
                    let track_row = tx.last_insert_rowid();
                    for tt in &track.tunes {
                        tune_stmt.execute(params![track_row, tt.tune_id, tt.name, tt.position])?;
                    }
                }
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO sessions (
                    session_id, name, full_address, town, area, country,
                    latitude, longitude, created_at, is_active, search_text
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for ss in &output.sessions {
                let s = &ss.session;
                stmt.execute(params![
                    s.session_id,
                    s.name,
                    s.full_address,
                    s.location.town,
                    s.location.area,
                    s.location.country,
                    s.location.latitude,
                    s.location.longitude,
                    timestamp(&s.created_at),
                    s.is_active,
                    ss.search_text,
                ])?;
                summary.sessions += 1;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO import_errors (entity_type, entity_id, message, raw) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for e in &output.stats.errors {
                stmt.execute(params![
                    e.entity_type.as_str(),
                    e.entity_id,
                    e.message,
                    serde_json::to_string(&e.raw)?,
                ])?;
                summary.errors += 1;
            }
        }

        tx.commit()?;
        log::info!(
            "Stored {} tunes, {} settings, {} sets, {} recordings, {} sessions, {} users, {} errors",
            summary.tunes,
            summary.settings,
            summary.sets,
            summary.recordings,
            summary.sessions,
            summary.users,
            summary.errors
        );
        Ok(summary)
    }

    /// Tunes whose search text contains `query`, most popular first.
    pub fn search_tunes(&self, query: &str, limit: usize) -> Result<Vec<TuneHit>> {
        let pattern = like_pattern(query);
        let mut stmt = self.conn.prepare(
            "SELECT t.tune_id, t.name, t.tune_type, t.popularity,
                    (SELECT COUNT(*) FROM settings s WHERE s.tune_id = t.tune_id)
             FROM tunes t
             WHERE t.search_text LIKE ?1 ESCAPE '\\'
             ORDER BY t.popularity DESC, t.tune_id
             LIMIT ?2",
        )?;

        let hits = stmt
            .query_map(params![pattern, limit as i64], |row| {
                Ok(TuneHit {
                    tune_id: row.get(0)?,
                    name: row.get(1)?,
                    tune_type: row.get(2)?,
                    popularity: row.get(3)?,
                    setting_count: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(hits)
    }

    /// Sessions whose search text contains `query`.
    pub fn search_sessions(&self, query: &str, limit: usize) -> Result<Vec<SessionHit>> {
        let pattern = like_pattern(query);
        let mut stmt = self.conn.prepare(
            "SELECT session_id, name, full_address
             FROM sessions
             WHERE search_text LIKE ?1 ESCAPE '\\'
             ORDER BY session_id
             LIMIT ?2",
        )?;

        let hits = stmt
            .query_map(params![pattern, limit as i64], |row| {
                Ok(SessionHit {
                    session_id: row.get(0)?,
                    name: row.get(1)?,
                    full_address: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(hits)
    }

    pub fn stats(&self) -> Result<CatalogStats> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        };

        let mut stmt = self.conn.prepare(
            "SELECT tune_type, COUNT(*) FROM tunes GROUP BY tune_type ORDER BY COUNT(*) DESC, tune_type",
        )?;
        let tune_types = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(CatalogStats {
            tunes: count("tunes")?,
            settings: count("settings")?,
            sets: count("tune_sets")?,
            recordings: count("recordings")?,
            sessions: count("sessions")?,
            users: count("users")?,
            import_errors: count("import_errors")?,
            tune_types,
        })
    }
}
