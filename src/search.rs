//! Search-ready projections of tunes and sessions.
//!
//! The canonical entities are left untouched; each projection is an enriched
//! copy carrying a lower-cased `search_text`.

use serde::{Deserialize, Serialize};

use crate::models::{NormalizedSession, NormalizedTune};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableTune {
    #[serde(flatten)]
    pub tune: NormalizedTune,
    pub search_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableSession {
    #[serde(flatten)]
    pub session: NormalizedSession,
    pub search_text: String,
}

/// Name, aliases, type and mode.
pub fn tune_search_text(tune: &NormalizedTune) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(tune.aliases.len() + 3);
    parts.push(&tune.name);
    parts.extend(tune.aliases.iter().map(String::as_str));
    parts.push(tune.tune_type.as_str());
    parts.push(&tune.mode);
    parts.join(" ").to_lowercase()
}

/// Venue name, town, area and country.
pub fn session_search_text(session: &NormalizedSession) -> String {
    [
        session.name.as_str(),
        session.location.town.as_str(),
        session.location.area.as_str(),
        session.location.country.as_str(),
    ]
    .join(" ")
    .to_lowercase()
}

/// Enriched copies of every tune and session.
pub fn generate_search_vectors(
    tunes: &[NormalizedTune],
    sessions: &[NormalizedSession],
) -> (Vec<SearchableTune>, Vec<SearchableSession>) {
    let tunes = tunes
        .iter()
        .map(|t| SearchableTune {
            search_text: tune_search_text(t),
            tune: t.clone(),
        })
        .collect();
    let sessions = sessions
        .iter()
        .map(|s| SearchableSession {
            search_text: session_search_text(s),
            session: s.clone(),
        })
        .collect();
    (tunes, sessions)
}
