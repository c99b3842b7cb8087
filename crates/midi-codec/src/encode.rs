use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::performance::{Event, EventKind, Performance, TimeSignature};
use crate::timing::{bpm_to_microseconds, seconds_to_ticks, DEFAULT_TICKS_PER_QUARTER};
use crate::tracks::{organize, TrackLayout};
use crate::{Error, Result};

/// Options for encoding a performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Display name written as the first meta entry, when present.
    pub track_name: Option<String>,
    /// Resolution written into the file header. Zero falls back to 480.
    pub ticks_per_quarter: u16,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            track_name: None,
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
        }
    }
}

/// Encode a performance into Standard MIDI File bytes.
///
/// Single-channel performances produce a format-0 file with one track;
/// multi-channel performances produce a format-1 file with a meta-only
/// first track and one track per channel. Irregular input is defaulted
/// rather than rejected: non-positive tempo becomes 120 BPM, a zeroed time
/// signature becomes 4/4, unknown event kinds are skipped. Encoding itself
/// cannot fail.
pub fn encode(performance: &Performance, options: &EncodeOptions) -> Vec<u8> {
    let tempo = performance.effective_tempo();
    let signature = performance.time_signature.normalized();
    let ticks_per_quarter = if options.ticks_per_quarter > 0 {
        options.ticks_per_quarter
    } else {
        DEFAULT_TICKS_PER_QUARTER
    };
    let end_tick = seconds_to_ticks(performance.total_time, tempo, ticks_per_quarter);

    let meta = meta_entries(options.track_name.as_deref(), tempo, signature);

    let track_blobs = match organize(&performance.events) {
        TrackLayout::Single { events } => {
            let mut entries = meta;
            entries.extend(note_entries(&events, tempo, ticks_per_quarter));
            vec![finish_track(entries, end_tick)]
        }
        TrackLayout::Multi { channels } => {
            let mut blobs = vec![finish_track(meta, end_tick)];
            for (_, events) in &channels {
                let entries = note_entries(events, tempo, ticks_per_quarter);
                let last_tick = entries.last().map(|&(tick, _)| tick).unwrap_or(0);
                blobs.push(finish_track(entries, last_tick));
            }
            blobs
        }
    };

    let format: u16 = if track_blobs.len() > 1 { 1 } else { 0 };
    debug!(
        format,
        tracks = track_blobs.len(),
        events = performance.events.len(),
        "encoded performance"
    );

    build_midi_file(format, ticks_per_quarter, &track_blobs)
}

/// Encode a performance that may be absent. Absence is the one hard
/// failure on the encode path; every other irregularity is defaulted by
/// [`encode`].
pub fn encode_document(
    performance: Option<&Performance>,
    options: &EncodeOptions,
) -> Result<Vec<u8>> {
    let performance = performance.ok_or(Error::NoPerformance)?;
    Ok(encode(performance, options))
}

/// Name, tempo, and time-signature meta entries, all at tick 0.
fn meta_entries(
    track_name: Option<&str>,
    tempo_bpm: u32,
    signature: TimeSignature,
) -> Vec<(u64, Vec<u8>)> {
    let mut entries = Vec::new();

    if let Some(name) = track_name {
        let bytes = name.as_bytes();
        let mut entry = vec![0xFF, 0x03];
        write_vlq(&mut entry, bytes.len() as u32);
        entry.extend_from_slice(bytes);
        entries.push((0, entry));
    }

    let usec = bpm_to_microseconds(tempo_bpm);
    entries.push((
        0,
        vec![
            0xFF,
            0x51,
            0x03,
            (usec >> 16) as u8,
            (usec >> 8) as u8,
            usec as u8,
        ],
    ));

    entries.push((
        0,
        vec![
            0xFF,
            0x58,
            0x04,
            signature.numerator,
            signature.denominator_pow(),
            0x18,
            0x08,
        ],
    ));

    entries
}

/// Note-on/note-off messages with absolute ticks, in the given order.
/// Out-of-range note and velocity values are masked into the 7-bit range
/// instead of rejected.
fn note_entries(events: &[Event], tempo_bpm: u32, ticks_per_quarter: u16) -> Vec<(u64, Vec<u8>)> {
    let mut entries = Vec::with_capacity(events.len());

    for event in events {
        let status = match event.kind {
            EventKind::NoteOn => 0x90,
            EventKind::NoteOff => 0x80,
            EventKind::Unknown => continue,
        };
        let tick = seconds_to_ticks(event.time, tempo_bpm, ticks_per_quarter);
        entries.push((
            tick,
            vec![
                status | (event.channel & 0x0F),
                event.note & 0x7F,
                event.velocity & 0x7F,
            ],
        ));
    }

    entries
}

/// Delta-encode a track's entries and close it with an end-of-track marker
/// at `end_tick` (or at the final entry, whichever is later).
fn finish_track(entries: Vec<(u64, Vec<u8>)>, end_tick: u64) -> Vec<u8> {
    let mut track_data = Vec::new();
    let mut last_tick = 0u64;

    for (tick, data) in entries {
        let delta = tick.saturating_sub(last_tick);
        write_vlq(&mut track_data, delta as u32);
        track_data.extend_from_slice(&data);
        last_tick = tick;
    }

    write_vlq(&mut track_data, end_tick.saturating_sub(last_tick) as u32);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

/// Assemble a complete MIDI file from track data blobs.
fn build_midi_file(format: u16, ticks_per_quarter: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&format.to_be_bytes());
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ticks_per_quarter.to_be_bytes());

    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Write a variable-length quantity to a byte buffer.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        buf.push(0);
        return;
    }

    let mut bytes = Vec::new();
    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}
