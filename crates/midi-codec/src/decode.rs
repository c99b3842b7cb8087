use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use tracing::debug;

use crate::performance::{Event, EventKind, Performance, TimeSignature};
use crate::timing::{microseconds_to_bpm, TempoMap, DEFAULT_TICKS_PER_QUARTER};
use crate::{Error, Result};

/// A note message with its absolute tick, before tick-to-seconds
/// conversion. Conversion waits until every tempo entry in the file has
/// been collected, so an event's time reflects all tempo changes before it
/// regardless of which track declares them.
struct RawEvent {
    tick: u64,
    kind: EventKind,
    note: u8,
    velocity: u8,
    channel: u8,
}

/// Decode Standard MIDI File bytes into a symbolic performance.
///
/// An unparsable buffer is the one hard failure; no partial output is ever
/// returned. A note-on with velocity zero decodes as a note-off. The
/// returned performance carries the tempo in effect at the end of the file
/// (120 if none was declared), the last time signature (4/4 if none), and
/// a `total_time` spanning every event in every track, end-of-track
/// markers included.
pub fn decode(bytes: &[u8]) -> Result<Performance> {
    let smf = Smf::parse(bytes).map_err(|e| Error::MidiParse(e.to_string()))?;

    let ticks_per_quarter = match smf.header.timing {
        midly::Timing::Metrical(ticks) if ticks.as_int() > 0 => ticks.as_int(),
        _ => DEFAULT_TICKS_PER_QUARTER,
    };

    let mut tempo_map = TempoMap::new();
    let mut signatures: Vec<(u64, TimeSignature)> = Vec::new();
    let mut raw_events: Vec<RawEvent> = Vec::new();
    let mut max_tick = 0u64;

    for track in &smf.tracks {
        let mut current_tick = 0u64;

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(usec)) => {
                    tempo_map.set(current_tick, microseconds_to_bpm(usec.as_int()));
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, pow, _, _)) => {
                    signatures.push((current_tick, TimeSignature::from_pow(num, pow)));
                }
                TrackEventKind::Midi { channel, message } => match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        raw_events.push(RawEvent {
                            tick: current_tick,
                            kind: EventKind::NoteOn,
                            note: key.as_int(),
                            velocity: vel.as_int(),
                            channel: channel.as_int(),
                        });
                    }
                    // A velocity-zero note-on is a note-off.
                    MidiMessage::NoteOn { key, vel } | MidiMessage::NoteOff { key, vel } => {
                        raw_events.push(RawEvent {
                            tick: current_tick,
                            kind: EventKind::NoteOff,
                            note: key.as_int(),
                            velocity: vel.as_int(),
                            channel: channel.as_int(),
                        });
                    }
                    _ => {}
                },
                _ => {}
            }

            max_tick = max_tick.max(current_tick);
        }
    }

    let mut events: Vec<Event> = raw_events
        .into_iter()
        .map(|raw| Event {
            time: tempo_map.seconds_at(raw.tick, ticks_per_quarter),
            kind: raw.kind,
            note: raw.note,
            velocity: raw.velocity,
            channel: raw.channel,
        })
        .collect();

    // Stable, so simultaneous events keep track order.
    events.sort_by(|a, b| a.time.total_cmp(&b.time));

    signatures.sort_by_key(|&(tick, _)| tick);
    let time_signature = signatures.last().map(|&(_, ts)| ts).unwrap_or_default();

    let total_time = tempo_map.seconds_at(max_tick, ticks_per_quarter);

    debug!(
        tracks = smf.tracks.len(),
        events = events.len(),
        ticks_per_quarter,
        "decoded performance"
    );

    Ok(Performance {
        events,
        tempo: tempo_map.last_bpm() as i32,
        time_signature,
        total_time,
    })
}
