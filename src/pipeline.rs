//! End-to-end run: normalize, link, project, summarize.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;

use crate::linker::{self, LinkReport, TuneLookup};
use crate::models::{ImportStats, NormalizedRecording, NormalizedTune, NormalizedTuneSet, User};
use crate::normalize::{self, OrderedIndex};
use crate::records::RawInputs;
use crate::search::{self, SearchableSession, SearchableTune};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Feature extraction workers. 0 = rayon default.
    pub workers: usize,
    /// Report set/recording references to unknown tunes as import errors.
    pub strict_links: bool,
    /// Show a progress bar over the feature sweep.
    pub progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            strict_links: false,
            progress: false,
        }
    }
}

/// Everything one run produces. Handed to the exporters by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub tunes: Vec<SearchableTune>,
    pub sets: Vec<NormalizedTuneSet>,
    pub recordings: Vec<NormalizedRecording>,
    pub sessions: Vec<SearchableSession>,
    pub users: Vec<User>,
    pub stats: ImportStats,
    #[serde(skip)]
    pub set_links: LinkReport,
    #[serde(skip)]
    pub recording_links: LinkReport,
}

/// Run the whole pipeline over already-loaded inputs.
///
/// Row-level problems end up in `stats.errors` and never fail the run; an
/// `Err` here means the run itself could not execute.
pub fn run(inputs: &RawInputs, options: &PipelineOptions) -> Result<PipelineOutput, PipelineError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()?;

    let pb = if options.progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut errors = Vec::new();

    // 1. Tunes (with aliases)
    let tunes = pool.install(|| {
        normalize::normalize_tunes_with_progress(&inputs.tunes, &inputs.aliases, &pb)
    });
    errors.extend(tunes.errors);
    let mut tunes = tunes.items;

    // 2. Popularity counts
    let popularity = normalize::apply_popularity(&mut tunes, &inputs.popularity);
    errors.extend(popularity.errors);

    // 3-5. Sets, recordings, sessions
    let sets = normalize::normalize_sets(&inputs.sets);
    errors.extend(sets.errors);
    let sets = sets.items;

    let recordings = normalize::normalize_recordings(&inputs.recordings);
    errors.extend(recordings.errors);
    let recordings = recordings.items;

    let sessions = normalize::normalize_sessions(&inputs.sessions);
    errors.extend(sessions.errors);
    let sessions = sessions.items;

    // 6. Reference checks
    let lookup = TuneLookup::new(&tunes);
    let set_links = linker::link_sets_to_tunes(&sets, &lookup);
    let recording_links = linker::link_recordings_to_tunes(&recordings, &lookup);
    if options.strict_links {
        errors.extend(set_links.unresolved.iter().map(|u| u.to_import_error()));
        errors.extend(recording_links.unresolved.iter().map(|u| u.to_import_error()));
    }

    // 7. Search projections
    let (searchable_tunes, searchable_sessions) = search::generate_search_vectors(&tunes, &sessions);

    // 8. Users
    let users = derive_users(&tunes, &sets);

    let stats = ImportStats {
        tunes_processed: tunes.len(),
        sets_processed: sets.len(),
        recordings_processed: recordings.len(),
        sessions_processed: sessions.len(),
        aliases_processed: inputs.aliases.len(),
        popularity_processed: inputs.popularity.len(),
        errors,
    };

    log::info!(
        "Pipeline complete: {} tunes, {} sets, {} recordings, {} sessions, {} users, {} errors",
        stats.tunes_processed,
        stats.sets_processed,
        stats.recordings_processed,
        stats.sessions_processed,
        users.len(),
        stats.errors.len()
    );

    Ok(PipelineOutput {
        tunes: searchable_tunes,
        sets,
        recordings,
        sessions: searchable_sessions,
        users,
        stats,
        set_links,
        recording_links,
    })
}

/// Unique non-empty usernames: setting contributors first, then set
/// creators, numbered from 1 in first-seen order.
pub fn derive_users(tunes: &[NormalizedTune], sets: &[NormalizedTuneSet]) -> Vec<User> {
    let mut users: OrderedIndex<String, User> = OrderedIndex::new();

    let contributors = tunes
        .iter()
        .flat_map(|t| &t.settings)
        .map(|s| s.contributor.as_str());
    let creators = sets.iter().map(|s| s.creator.as_str());

    for username in contributors.chain(creators) {
        if username.trim().is_empty() {
            continue;
        }
        let next_id = users.len() as i64 + 1;
        users.get_or_insert_with(username.to_string(), || User {
            user_id: next_id,
            username: username.to_string(),
        });
    }

    users.into_values()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{RawSetRow, RawTuneRow};

    fn tune_row(tune_id: &str, setting_id: &str, user: &str) -> RawTuneRow {
        RawTuneRow {
            tune_id: tune_id.into(),
            setting_id: setting_id.into(),
            name: "T".into(),
            tune_type: "jig".into(),
            date: "2003-02-01 10:00:00".into(),
            username: user.into(),
            ..Default::default()
        }
    }

    fn set_row(set_id: &str, tune_id: &str, user: &str) -> RawSetRow {
        RawSetRow {
            tuneset: set_id.into(),
            settingorder: "1".into(),
            tune_id: tune_id.into(),
            setting_id: "1".into(),
            date: "2003-02-01 10:00:00".into(),
            username: user.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_users_first_seen() {
        let inputs = RawInputs {
            tunes: vec![tune_row("1", "1", "ann"), tune_row("2", "2", "bob"), tune_row("1", "3", "ann")],
            sets: vec![set_row("1", "1", "cat"), set_row("2", "2", "bob"), set_row("3", "2", "")],
            ..Default::default()
        };
        let out = run(&inputs, &PipelineOptions::default()).unwrap();
        let names: Vec<(i64, &str)> = out
            .users
            .iter()
            .map(|u| (u.user_id, u.username.as_str()))
            .collect();
        assert_eq!(names, vec![(1, "ann"), (2, "bob"), (3, "cat")]);
    }

    #[test]
    fn test_unresolved_links_only_errors_when_strict() {
        let inputs = RawInputs {
            tunes: vec![tune_row("1", "1", "ann")],
            sets: vec![set_row("1", "1", "ann"), set_row("1", "404", "ann")],
            ..Default::default()
        };

        let lax = run(&inputs, &PipelineOptions::default()).unwrap();
        assert!(lax.stats.errors.is_empty());
        assert_eq!(lax.set_links.unresolved.len(), 1);

        let strict = run(&inputs, &PipelineOptions { strict_links: true, ..Default::default() }).unwrap();
        assert_eq!(strict.stats.errors.len(), 1);
        assert_eq!(strict.stats.errors[0].message, "references unknown tune 404");
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let tunes: Vec<RawTuneRow> = (0..300)
            .map(|i| tune_row(&(i % 11).to_string(), &i.to_string(), "ann"))
            .collect();
        let inputs = RawInputs { tunes, ..Default::default() };
        let one = run(&inputs, &PipelineOptions { workers: 1, ..Default::default() }).unwrap();
        let four = run(&inputs, &PipelineOptions { workers: 4, ..Default::default() }).unwrap();
        assert_eq!(one.tunes, four.tunes);
    }
}
