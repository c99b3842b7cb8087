use std::collections::BTreeMap;

use crate::performance::{Event, EventKind};

/// Binary layout chosen for a performance's events.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackLayout {
    /// Format 0: meta entries and note events share one track.
    Single { events: Vec<Event> },
    /// Format 1: a meta-only first track, then one track per channel in
    /// ascending channel order.
    Multi { channels: Vec<(u8, Vec<Event>)> },
}

/// Partition events by channel and pick the binary layout.
///
/// Unknown event kinds are dropped here so the encoder only ever sees
/// messages it can emit. Each channel's events are stable-sorted by time,
/// which keeps encounter order for simultaneous events.
pub fn organize(events: &[Event]) -> TrackLayout {
    let mut by_channel: BTreeMap<u8, Vec<Event>> = BTreeMap::new();
    for event in events {
        if event.kind == EventKind::Unknown {
            continue;
        }
        by_channel
            .entry(event.channel)
            .or_default()
            .push(event.clone());
    }

    for group in by_channel.values_mut() {
        group.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    if by_channel.len() > 1 {
        TrackLayout::Multi {
            channels: by_channel.into_iter().collect(),
        }
    } else {
        TrackLayout::Single {
            events: by_channel.into_values().next().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(time: f64, kind: EventKind, note: u8, channel: u8) -> Event {
        Event {
            time,
            kind,
            note,
            velocity: 100,
            channel,
        }
    }

    #[test]
    fn one_channel_picks_single_layout() {
        let events = vec![
            event(0.5, EventKind::NoteOn, 64, 0),
            event(0.0, EventKind::NoteOn, 60, 0),
            event(1.0, EventKind::NoteOff, 60, 0),
        ];
        match organize(&events) {
            TrackLayout::Single { events } => {
                let times: Vec<f64> = events.iter().map(|e| e.time).collect();
                assert_eq!(times, vec![0.0, 0.5, 1.0]);
            }
            other => panic!("expected single layout, got {other:?}"),
        }
    }

    #[test]
    fn two_channels_pick_multi_layout_in_ascending_order() {
        let events = vec![
            event(0.0, EventKind::NoteOn, 60, 2),
            event(0.0, EventKind::NoteOn, 48, 0),
            event(1.0, EventKind::NoteOff, 60, 2),
            event(1.0, EventKind::NoteOff, 48, 0),
        ];
        match organize(&events) {
            TrackLayout::Multi { channels } => {
                assert_eq!(channels.len(), 2);
                assert_eq!(channels[0].0, 0);
                assert_eq!(channels[1].0, 2);
                assert!(channels[0].1.iter().all(|e| e.channel == 0));
                assert!(channels[1].1.iter().all(|e| e.channel == 2));
            }
            other => panic!("expected multi layout, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kinds_are_dropped() {
        let events = vec![
            event(0.0, EventKind::NoteOn, 60, 0),
            event(0.1, EventKind::Unknown, 61, 5),
            event(0.5, EventKind::NoteOff, 60, 0),
        ];
        match organize(&events) {
            TrackLayout::Single { events } => assert_eq!(events.len(), 2),
            other => panic!("expected single layout, got {other:?}"),
        }
    }

    #[test]
    fn no_events_still_single_layout() {
        match organize(&[]) {
            TrackLayout::Single { events } => assert!(events.is_empty()),
            other => panic!("expected single layout, got {other:?}"),
        }
    }

    #[test]
    fn simultaneous_events_keep_encounter_order() {
        let events = vec![
            event(0.0, EventKind::NoteOn, 60, 0),
            event(0.0, EventKind::NoteOn, 64, 0),
            event(0.0, EventKind::NoteOn, 67, 0),
        ];
        match organize(&events) {
            TrackLayout::Single { events } => {
                let notes: Vec<u8> = events.iter().map(|e| e.note).collect();
                assert_eq!(notes, vec![60, 64, 67]);
            }
            other => panic!("expected single layout, got {other:?}"),
        }
    }
}
