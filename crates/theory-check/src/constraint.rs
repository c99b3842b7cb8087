use serde::{Deserialize, Serialize};
use tracing::debug;

use midi_codec::{EventKind, Performance};

use crate::key::{heuristic_key, heuristic_root, keys_match, note_name, parse_root};
use crate::scales::{self, ScaleKind};

/// Numeric and music-theory bounds a contest entry must satisfy. Every
/// field is optional; absent bounds are simply not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub bpm_min: Option<i32>,
    pub bpm_max: Option<i32>,
    pub duration_min: Option<f64>,
    pub duration_max: Option<f64>,
    pub note_count_min: Option<usize>,
    pub note_count_max: Option<usize>,
    pub key: Option<String>,
    pub scale: Option<String>,
}

/// How gaps in the input are treated during checking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Unresolvable performances and unrecognized scale names pass. The
    /// historical behavior, and the default.
    #[default]
    Lenient,
    /// Unresolvable performances and unrecognized scale names are
    /// violations.
    Strict,
}

/// The first constraint a submission failed, carrying the actual value and
/// the violated bound.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Violation {
    #[error("tempo {actual} BPM is below the minimum {min} BPM")]
    TempoTooLow { actual: i32, min: i32 },
    #[error("tempo {actual} BPM is above the maximum {max} BPM")]
    TempoTooHigh { actual: i32, max: i32 },
    #[error("duration {actual:.2}s is shorter than the minimum {min:.2}s")]
    DurationTooShort { actual: f64, min: f64 },
    #[error("duration {actual:.2}s is longer than the maximum {max:.2}s")]
    DurationTooLong { actual: f64, max: f64 },
    #[error("{actual} notes is fewer than the minimum {min}")]
    TooFewNotes { actual: usize, min: usize },
    #[error("{actual} notes is more than the maximum {max}")]
    TooManyNotes { actual: usize, max: usize },
    #[error("key {actual:?} does not match the required key {required:?}")]
    KeyMismatch { actual: String, required: String },
    #[error("note {note} is outside the {scale} scale rooted at {root}")]
    ScaleMismatch {
        note: &'static str,
        scale: ScaleKind,
        root: &'static str,
    },
    #[error("no performance data available to check")]
    NoData,
    #[error("unrecognized scale name {name:?}")]
    UnknownScale { name: String },
}

/// A stored pattern document: the symbolic performance plus the display
/// metadata the platform keeps alongside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternData {
    pub performance: Option<Performance>,
    pub key: Option<String>,
    pub name: Option<String>,
}

/// The places a submission may carry its performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryData {
    /// Pattern the submission references directly.
    pub pattern: Option<PatternData>,
    /// Performance inlined in the submission itself.
    pub inline: Option<Performance>,
    /// Pattern implied by a linked post.
    pub linked_post: Option<PatternData>,
}

/// Locate the performance to check and any stored key label that travels
/// with it. Sources are tried in order: referenced pattern, inline data,
/// linked post's pattern. A source without performance data is skipped.
pub fn resolve_performance(entry: &EntryData) -> Option<(&Performance, Option<&str>)> {
    if let Some(pattern) = &entry.pattern {
        if let Some(performance) = &pattern.performance {
            return Some((performance, pattern.key.as_deref()));
        }
    }
    if let Some(performance) = &entry.inline {
        return Some((performance, None));
    }
    if let Some(pattern) = &entry.linked_post {
        if let Some(performance) = &pattern.performance {
            return Some((performance, pattern.key.as_deref()));
        }
    }
    None
}

/// Check a submission against a constraint set, returning the first
/// violation or `Ok(())` when every present bound is satisfied.
///
/// When no performance is resolvable, lenient mode passes the submission
/// and strict mode reports [`Violation::NoData`].
pub fn check_entry(
    entry: &EntryData,
    constraints: &Constraints,
    mode: CheckMode,
) -> Result<(), Violation> {
    match resolve_performance(entry) {
        Some((performance, stored_key)) => {
            check_performance(performance, stored_key, constraints, mode)
        }
        None => match mode {
            CheckMode::Lenient => {
                debug!("no performance data resolvable, passing leniently");
                Ok(())
            }
            CheckMode::Strict => Err(Violation::NoData),
        },
    }
}

/// Check one performance against a constraint set. `stored_key` is the
/// explicit key label stored with the pattern, if any; without one the key
/// check falls back to heuristic inference.
pub fn check_performance(
    performance: &Performance,
    stored_key: Option<&str>,
    constraints: &Constraints,
    mode: CheckMode,
) -> Result<(), Violation> {
    check_tempo(performance, constraints)?;
    check_duration(performance, constraints)?;
    check_note_count(performance, constraints)?;
    check_key(performance, stored_key, constraints)?;
    check_scale(performance, constraints, mode)?;
    Ok(())
}

fn check_tempo(performance: &Performance, constraints: &Constraints) -> Result<(), Violation> {
    let actual = performance.effective_tempo() as i32;
    if let Some(min) = constraints.bpm_min {
        if actual < min {
            return Err(Violation::TempoTooLow { actual, min });
        }
    }
    if let Some(max) = constraints.bpm_max {
        if actual > max {
            return Err(Violation::TempoTooHigh { actual, max });
        }
    }
    Ok(())
}

fn check_duration(performance: &Performance, constraints: &Constraints) -> Result<(), Violation> {
    let actual = performance.total_time;
    if let Some(min) = constraints.duration_min {
        if actual < min {
            return Err(Violation::DurationTooShort { actual, min });
        }
    }
    if let Some(max) = constraints.duration_max {
        if actual > max {
            return Err(Violation::DurationTooLong { actual, max });
        }
    }
    Ok(())
}

fn check_note_count(performance: &Performance, constraints: &Constraints) -> Result<(), Violation> {
    let actual = performance.note_on_count();
    if let Some(min) = constraints.note_count_min {
        if actual < min {
            return Err(Violation::TooFewNotes { actual, min });
        }
    }
    if let Some(max) = constraints.note_count_max {
        if actual > max {
            return Err(Violation::TooManyNotes { actual, max });
        }
    }
    Ok(())
}

fn check_key(
    performance: &Performance,
    stored_key: Option<&str>,
    constraints: &Constraints,
) -> Result<(), Violation> {
    let Some(required) = &constraints.key else {
        return Ok(());
    };

    let actual = match stored_key {
        Some(label) if !label.trim().is_empty() => label.to_string(),
        _ => match heuristic_key(performance) {
            Some(guess) => guess.name,
            // Nothing to infer a key from.
            None => return Ok(()),
        },
    };

    if keys_match(&actual, required) {
        Ok(())
    } else {
        Err(Violation::KeyMismatch {
            actual,
            required: required.clone(),
        })
    }
}

fn check_scale(
    performance: &Performance,
    constraints: &Constraints,
    mode: CheckMode,
) -> Result<(), Violation> {
    let Some(name) = &constraints.scale else {
        return Ok(());
    };

    let Some(template) = scales::lookup(name) else {
        return match mode {
            CheckMode::Lenient => {
                debug!(scale = %name, "unrecognized scale name, passing leniently");
                Ok(())
            }
            CheckMode::Strict => Err(Violation::UnknownScale { name: name.clone() }),
        };
    };

    // The constraint's own key names the root when it parses; otherwise the
    // most frequent pitch class stands in.
    let root = constraints
        .key
        .as_deref()
        .and_then(parse_root)
        .or_else(|| heuristic_root(performance));
    let Some(root) = root else {
        return Ok(());
    };

    let mut pitch_classes: Vec<u8> = performance
        .events
        .iter()
        .filter(|e| e.kind == EventKind::NoteOn)
        .map(|e| e.note % 12)
        .collect();
    pitch_classes.sort_unstable();
    pitch_classes.dedup();

    if let Some(pc) = template.first_outside(&pitch_classes, root) {
        return Err(Violation::ScaleMismatch {
            note: note_name(pc),
            scale: template.kind,
            root: note_name(root),
        });
    }
    Ok(())
}
