//! Melody fingerprinting from ABC-style notation.
//!
//! This is a regex-level compression of the notation, not a parser: chords,
//! ties, grace notes, ornaments and multiple voices are not modeled. Similarity
//! scoring downstream is defined against exactly this feature shape.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::MusicalFeatures;

/// Default key when no `K:` header is present.
pub const DEFAULT_KEY: &str = "C";

/// Default meter when no `M:` header is present.
pub const DEFAULT_METER: &str = "4/4";

/// Length cap of the rhythmic pattern, in characters.
pub const RHYTHM_PATTERN_LEN: usize = 32;

// One note: pitch letter, octave marks, optional duration ("2", "/2", "3/2", "/")
static NOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Ga-g][',]*(?:\d*/\d*|\d+)?").unwrap()
});

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"K:\s*([A-G][#b]?(?:maj|min|dor|mix|lyd|phr|loc)?)").unwrap()
});

static METER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"M:\s*(\d+/\d+)").unwrap()
});

static PITCH_LETTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Ga-g]").unwrap()
});

/// Extract features from a notation string. Never fails; missing headers
/// fall back to [`DEFAULT_KEY`] and [`DEFAULT_METER`].
pub fn extract(abc: &str) -> MusicalFeatures {
    let music = music_body(abc);

    let pitches: Vec<i32> = NOTE_RE
        .find_iter(&music)
        .filter_map(|m| m.as_str().chars().next())
        .map(pitch_class)
        .collect();

    let intervals: Vec<i32> = pitches.windows(2).map(|w| w[1] - w[0]).collect();
    let melodic_contour: Vec<i8> = intervals.iter().map(|i| i.signum() as i8).collect();

    MusicalFeatures {
        key_signature: key_signature(abc),
        time_signature: time_signature(abc),
        note_count: pitches.len(),
        melodic_contour,
        intervals,
        rhythmic_pattern: rhythmic_pattern(abc),
    }
}

/// Semitone number of a pitch letter. Uppercase is the lower octave,
/// lowercase adds 12. Anything else maps to 0.
pub fn pitch_class(letter: char) -> i32 {
    match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        'c' => 12,
        'd' => 14,
        'e' => 16,
        'f' => 17,
        'g' => 19,
        'a' => 21,
        'b' => 23,
        _ => 0,
    }
}

/// Lines that are neither blank nor M:/L:/K: headers, concatenated.
fn music_body(abc: &str) -> String {
    abc.lines()
        .filter(|line| {
            let l = line.trim_start();
            !(l.is_empty() || l.starts_with("M:") || l.starts_with("L:") || l.starts_with("K:"))
        })
        .collect()
}

/// First `K:` header match in the raw notation.
pub fn key_signature(abc: &str) -> String {
    KEY_RE
        .captures(abc)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_KEY.to_string())
}

/// First `M:` header match in the raw notation.
pub fn time_signature(abc: &str) -> String {
    METER_RE
        .captures(abc)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_METER.to_string())
}

/// Pitch letters replaced by `X`, first 32 characters.
pub fn rhythmic_pattern(abc: &str) -> String {
    PITCH_LETTER_RE
        .replace_all(abc, "X")
        .chars()
        .take(RHYTHM_PATTERN_LEN)
        .collect()
}
