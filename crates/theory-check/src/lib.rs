pub mod constraint;
pub mod key;
pub mod scales;

pub use constraint::{
    check_entry, check_performance, resolve_performance, CheckMode, Constraints, EntryData,
    PatternData, Violation,
};
pub use key::{
    heuristic_key, heuristic_root, keys_match, note_name, parse_root, pitch_class_histogram,
    KeyGuess,
};
pub use scales::{lookup, ScaleKind, ScaleTemplate, TEMPLATES};
