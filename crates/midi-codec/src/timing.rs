//! Tick/time arithmetic shared by the encoder and decoder.

/// Resolution written into every encoded file, and the fallback when a
/// decoded file's division field is not metric.
pub const DEFAULT_TICKS_PER_QUARTER: u16 = 480;

/// Tempo substituted wherever a non-positive or missing tempo is consumed.
pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// Convert seconds to absolute ticks at a fixed tempo, flooring.
///
/// Total over all inputs: negative or non-finite seconds clamp to zero.
/// Callers must pre-sanitize `bpm` and `ticks_per_quarter` to positive
/// values.
pub fn seconds_to_ticks(seconds: f64, bpm: u32, ticks_per_quarter: u16) -> u64 {
    (seconds * (bpm as f64 / 60.0) * ticks_per_quarter as f64).floor() as u64
}

/// Exact algebraic inverse of [`seconds_to_ticks`], without flooring.
pub fn ticks_to_seconds(ticks: u64, bpm: u32, ticks_per_quarter: u16) -> f64 {
    ticks as f64 * 60.0 / (bpm as f64 * ticks_per_quarter as f64)
}

/// Microseconds per quarter note for a BPM, as stored in a tempo meta entry.
pub fn bpm_to_microseconds(bpm: u32) -> u32 {
    60_000_000 / bpm
}

/// BPM for a tempo meta entry's microseconds-per-quarter value.
/// A zero value falls back to the default tempo.
pub fn microseconds_to_bpm(microseconds: u32) -> u32 {
    if microseconds == 0 {
        DEFAULT_TEMPO_BPM
    } else {
        60_000_000 / microseconds
    }
}

/// Tempo breakpoints collected while decoding a file, integrated piecewise
/// when converting an absolute tick to seconds.
///
/// Before the first breakpoint the default tempo applies. A breakpoint at
/// tick `t` governs time from `t` onward, so it does not move events at `t`
/// itself.
#[derive(Debug, Clone, Default)]
pub struct TempoMap {
    changes: Vec<(u64, u32)>,
}

impl TempoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tempo change, keeping breakpoints sorted by tick. A second
    /// entry at the same tick overwrites the first.
    pub fn set(&mut self, tick: u64, bpm: u32) {
        if bpm == 0 {
            return;
        }
        match self.changes.binary_search_by_key(&tick, |&(t, _)| t) {
            Ok(i) => self.changes[i].1 = bpm,
            Err(i) => self.changes.insert(i, (tick, bpm)),
        }
    }

    /// Tempo in effect at `tick`.
    pub fn bpm_at(&self, tick: u64) -> u32 {
        let mut bpm = DEFAULT_TEMPO_BPM;
        for &(t, b) in &self.changes {
            if t > tick {
                break;
            }
            bpm = b;
        }
        bpm
    }

    /// Tempo in effect after the final breakpoint, or the default if the
    /// file declared none.
    pub fn last_bpm(&self) -> u32 {
        self.changes
            .last()
            .map(|&(_, b)| b)
            .unwrap_or(DEFAULT_TEMPO_BPM)
    }

    /// Seconds elapsed at an absolute tick, summing each constant-tempo
    /// span before it.
    pub fn seconds_at(&self, tick: u64, ticks_per_quarter: u16) -> f64 {
        let mut seconds = 0.0;
        let mut span_start = 0u64;
        let mut bpm = DEFAULT_TEMPO_BPM;
        for &(t, b) in &self.changes {
            if t >= tick {
                break;
            }
            seconds += ticks_to_seconds(t - span_start, bpm, ticks_per_quarter);
            span_start = t;
            bpm = b;
        }
        seconds + ticks_to_seconds(tick - span_start, bpm, ticks_per_quarter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn one_second_at_120_bpm_is_960_ticks() {
        assert_eq!(seconds_to_ticks(1.0, 120, 480), 960);
        assert_eq!(ticks_to_seconds(960, 120, 480), 1.0);
    }

    #[test]
    fn conversions_invert_within_one_tick() {
        for &(seconds, bpm) in &[(0.25, 90), (1.3333, 140), (7.01, 63)] {
            let ticks = seconds_to_ticks(seconds, bpm, 480);
            let back = ticks_to_seconds(ticks, bpm, 480);
            let one_tick = ticks_to_seconds(1, bpm, 480);
            assert!(
                (seconds - back).abs() <= one_tick,
                "{seconds}s at {bpm} BPM came back as {back}s"
            );
        }
    }

    #[test]
    fn negative_seconds_clamp_to_zero_ticks() {
        assert_eq!(seconds_to_ticks(-1.0, 120, 480), 0);
    }

    #[test]
    fn bpm_microsecond_conversions() {
        assert_eq!(bpm_to_microseconds(120), 500_000);
        assert_eq!(microseconds_to_bpm(500_000), 120);
        assert_eq!(microseconds_to_bpm(0), DEFAULT_TEMPO_BPM);
    }

    #[test]
    fn empty_tempo_map_uses_default() {
        let map = TempoMap::new();
        assert_eq!(map.bpm_at(0), 120);
        assert_eq!(map.last_bpm(), 120);
        assert_eq!(map.seconds_at(960, 480), 1.0);
    }

    #[test]
    fn tempo_map_integrates_piecewise() {
        let mut map = TempoMap::new();
        map.set(0, 120);
        map.set(960, 240);

        // One second of 120 BPM, then 480 ticks at 240 BPM.
        assert_eq!(map.seconds_at(960, 480), 1.0);
        assert_eq!(map.seconds_at(1440, 480), 1.25);
        assert_eq!(map.bpm_at(959), 120);
        assert_eq!(map.bpm_at(960), 240);
        assert_eq!(map.last_bpm(), 240);
    }

    #[test]
    fn same_tick_change_overwrites() {
        let mut map = TempoMap::new();
        map.set(0, 100);
        map.set(0, 150);
        assert_eq!(map.bpm_at(0), 150);
    }

    #[test]
    fn out_of_order_changes_stay_sorted() {
        let mut map = TempoMap::new();
        map.set(960, 240);
        map.set(0, 60);
        assert_eq!(map.bpm_at(10), 60);
        assert_eq!(map.bpm_at(1000), 240);
        // 960 ticks at 60 BPM is two seconds.
        assert_eq!(map.seconds_at(960, 480), 2.0);
    }
}
