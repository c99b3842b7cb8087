use serde::{Deserialize, Serialize};

use crate::timing::DEFAULT_TEMPO_BPM;

/// What a timed event does.
///
/// Kinds outside the closed set deserialize as [`EventKind::Unknown`]; the
/// encoder skips them instead of rejecting the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NoteOn,
    NoteOff,
    #[serde(other)]
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NoteOn => "note_on",
            EventKind::NoteOff => "note_off",
            EventKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single timed event, positioned in seconds from the start of the
/// performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// MIDI note number (0–127).
    pub note: u8,
    pub velocity: u8,
    #[serde(default)]
    pub channel: u8,
}

/// A time signature. Serialized at the document boundary as a
/// `[numerator, denominator]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u8, u8)", into = "(u8, u8)")]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    /// Power-of-two exponent of the denominator, as stored in the binary
    /// meta field. Non-power-of-two denominators floor to the exponent of
    /// the nearest power below; zero falls back to the 4/4 default.
    pub fn denominator_pow(&self) -> u8 {
        if self.denominator == 0 {
            2
        } else {
            self.denominator.ilog2() as u8
        }
    }

    /// Rebuild a signature from the binary meta field's exponent form.
    /// Exponents too large for a u8 denominator fall back to 4.
    pub fn from_pow(numerator: u8, pow: u8) -> Self {
        let denominator = 1u8.checked_shl(pow.into()).unwrap_or(4);
        Self {
            numerator,
            denominator,
        }
    }

    /// The signature with zeroed fields replaced by the 4/4 default.
    pub fn normalized(&self) -> Self {
        let d = Self::default();
        Self {
            numerator: if self.numerator == 0 {
                d.numerator
            } else {
                self.numerator
            },
            denominator: if self.denominator == 0 {
                d.denominator
            } else {
                self.denominator
            },
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl From<(u8, u8)> for TimeSignature {
    fn from((numerator, denominator): (u8, u8)) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl From<TimeSignature> for (u8, u8) {
    fn from(ts: TimeSignature) -> (u8, u8) {
        (ts.numerator, ts.denominator)
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// A symbolic performance: the document form this crate encodes to and
/// decodes from Standard MIDI File bytes.
///
/// Canonical event order is ascending `time`, ties kept in encounter order.
/// A `Performance` is a value; the codec and any analysis over it return new
/// values or verdicts, never mutate one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    #[serde(default)]
    pub events: Vec<Event>,
    /// Beats per minute. Zero or negative means "use the default" wherever
    /// the tempo is consumed.
    #[serde(default)]
    pub tempo: i32,
    #[serde(default)]
    pub time_signature: TimeSignature,
    /// Nominal end of the piece in seconds, independent of the last event.
    #[serde(default)]
    pub total_time: f64,
}

impl Performance {
    /// Tempo with the non-positive guard applied.
    pub fn effective_tempo(&self) -> u32 {
        if self.tempo > 0 {
            self.tempo as u32
        } else {
            DEFAULT_TEMPO_BPM
        }
    }

    pub fn note_on_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == EventKind::NoteOn)
            .count()
    }
}
