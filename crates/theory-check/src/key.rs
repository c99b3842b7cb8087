use serde::{Deserialize, Serialize};

use midi_codec::{EventKind, Performance};

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const NOTE_NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Pitch classes conventionally spelled with flats.
const FLAT_ROOTS: [u8; 6] = [1, 3, 5, 6, 8, 10]; // Db, Eb, F, Gb, Ab, Bb

/// Canonical name for a pitch class, spelled with flats where convention
/// prefers them.
pub fn note_name(pitch_class: u8) -> &'static str {
    let pc = pitch_class % 12;
    if FLAT_ROOTS.contains(&pc) {
        NOTE_NAMES_FLAT[pc as usize]
    } else {
        NOTE_NAMES_SHARP[pc as usize]
    }
}

/// Parse the root pitch class out of a key label ("C", "f#", "Bb minor").
/// `None` when the label does not start with a note letter.
pub fn parse_root(label: &str) -> Option<u8> {
    let mut chars = label.trim().chars();
    let base: i8 = match chars.next()?.to_ascii_lowercase() {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };
    let offset: i8 = match chars.next() {
        Some('#') => 1,
        Some('b') => -1,
        _ => 0,
    };
    Some((base + offset).rem_euclid(12) as u8)
}

/// Fuzzy key-label comparison: case-insensitive, whitespace-trimmed,
/// prefix containment in either direction, with `min`/`minor` suffixes
/// read as a trailing `m`. "C major" matches "C"; "Am" matches "A minor".
pub fn keys_match(a: &str, b: &str) -> bool {
    let a = canonicalize(a);
    let b = canonicalize(b);
    if a.is_empty() || b.is_empty() {
        return a == b;
    }
    a.starts_with(&b) || b.starts_with(&a)
}

fn canonicalize(label: &str) -> String {
    let label = label.trim().to_lowercase();
    if let Some(stripped) = label.strip_suffix("minor") {
        return format!("{}m", stripped.trim_end());
    }
    if let Some(stripped) = label.strip_suffix("min") {
        return format!("{}m", stripped.trim_end());
    }
    label
}

/// Count-based pitch-class histogram over a performance's note-ons.
pub fn pitch_class_histogram(performance: &Performance) -> [usize; 12] {
    let mut histogram = [0usize; 12];
    for event in &performance.events {
        if event.kind == EventKind::NoteOn {
            histogram[(event.note % 12) as usize] += 1;
        }
    }
    histogram
}

/// Most frequent pitch class among note-ons; the lowest class wins ties.
/// `None` when the performance has no note-ons.
pub fn heuristic_root(performance: &Performance) -> Option<u8> {
    let histogram = pitch_class_histogram(performance);
    let mut root = None;
    let mut best = 0usize;
    for (pc, &count) in histogram.iter().enumerate() {
        if count > best {
            best = count;
            root = Some(pc as u8);
        }
    }
    root
}

/// A key label inferred by pitch-class frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyGuess {
    pub root: u8,
    pub name: String,
}

/// Infer a key label by frequency: the most common pitch class becomes the
/// root, and major is assumed. This is a statistical shortcut, not a
/// key-finding algorithm; treat its answer as a guess.
pub fn heuristic_key(performance: &Performance) -> Option<KeyGuess> {
    let root = heuristic_root(performance)?;
    Some(KeyGuess {
        root,
        name: format!("{} major", note_name(root)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use midi_codec::{Event, TimeSignature};
    use pretty_assertions::assert_eq;

    fn make_performance(notes: &[u8]) -> Performance {
        let events = notes
            .iter()
            .enumerate()
            .map(|(i, &note)| Event {
                time: i as f64 * 0.5,
                kind: EventKind::NoteOn,
                note,
                velocity: 100,
                channel: 0,
            })
            .collect();
        Performance {
            events,
            tempo: 120,
            time_signature: TimeSignature::default(),
            total_time: notes.len() as f64 * 0.5,
        }
    }

    #[test]
    fn prefix_containment_both_directions() {
        assert!(keys_match("C major", "C"));
        assert!(keys_match("C", "C major"));
        assert!(!keys_match("D", "C"));
    }

    #[test]
    fn minor_spellings_are_equivalent() {
        assert!(keys_match("Am", "A minor"));
        assert!(keys_match("a minor", "Am"));
        assert!(keys_match("E min", "Em"));
        assert!(keys_match("C minor", "Cm"));
    }

    #[test]
    fn major_label_does_not_match_minor_constraint() {
        assert!(!keys_match("C major", "Cm"));
        assert!(!keys_match("A major", "A minor"));
    }

    #[test]
    fn comparison_ignores_case_and_whitespace() {
        assert!(keys_match("  c MAJOR ", "C"));
        assert!(keys_match("F#", "f# major"));
    }

    #[test]
    fn empty_labels_only_match_each_other() {
        assert!(keys_match("", ""));
        assert!(!keys_match("", "C"));
        assert!(!keys_match("C", " "));
    }

    #[test]
    fn parse_root_reads_letter_and_accidental() {
        assert_eq!(parse_root("C"), Some(0));
        assert_eq!(parse_root("c#"), Some(1));
        assert_eq!(parse_root("Bb"), Some(10));
        assert_eq!(parse_root("f# minor"), Some(6));
        assert_eq!(parse_root("Cb"), Some(11));
        assert_eq!(parse_root("B#"), Some(0));
        assert_eq!(parse_root("H"), None);
        assert_eq!(parse_root(""), None);
    }

    #[test]
    fn histogram_counts_note_ons_only() {
        let mut perf = make_performance(&[60, 60, 64]);
        perf.events.push(Event {
            time: 2.0,
            kind: EventKind::NoteOff,
            note: 60,
            velocity: 0,
            channel: 0,
        });

        let histogram = pitch_class_histogram(&perf);
        assert_eq!(histogram[0], 2);
        assert_eq!(histogram[4], 1);
        assert_eq!(histogram.iter().sum::<usize>(), 3);
    }

    #[test]
    fn most_frequent_pitch_class_wins() {
        // G appears three times, C twice.
        let perf = make_performance(&[67, 60, 67, 60, 67]);
        assert_eq!(heuristic_root(&perf), Some(7));
    }

    #[test]
    fn ties_go_to_the_lowest_pitch_class() {
        let perf = make_performance(&[64, 60, 67]);
        assert_eq!(heuristic_root(&perf), Some(0));
    }

    #[test]
    fn guess_assumes_major_with_flat_spelling() {
        let perf = make_performance(&[70, 70, 65]);
        let guess = heuristic_key(&perf).unwrap();
        assert_eq!(guess.root, 10);
        assert_eq!(guess.name, "Bb major");
    }

    #[test]
    fn empty_performance_has_no_guess() {
        let perf = make_performance(&[]);
        assert_eq!(heuristic_root(&perf), None);
        assert!(heuristic_key(&perf).is_none());
    }
}
