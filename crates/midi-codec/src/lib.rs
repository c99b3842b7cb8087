pub mod decode;
pub mod encode;
pub mod performance;
pub mod timing;
pub mod tracks;

pub use decode::decode;
pub use encode::{encode, encode_document, EncodeOptions};
pub use performance::{Event, EventKind, Performance, TimeSignature};
pub use timing::{
    seconds_to_ticks, ticks_to_seconds, TempoMap, DEFAULT_TEMPO_BPM, DEFAULT_TICKS_PER_QUARTER,
};
pub use tracks::{organize, TrackLayout};

/// Errors from codec operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no performance data to encode")]
    NoPerformance,
    #[error("MIDI parse error: {0}")]
    MidiParse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
