//! Tempo map: score ticks ↔ real-time seconds.
//!
//! A piecewise-constant map over tempo change events. The unwinder treats it
//! as a black box with two monotonic conversion functions; it is consulted
//! once per segment while stamping unwound times and again by the time-domain
//! queries.

use serde::{Deserialize, Serialize};

/// Slowest accepted tempo
pub const MIN_TEMPO: f64 = 20.0;

/// Fastest accepted tempo
pub const MAX_TEMPO: f64 = 400.0;

const DEFAULT_BPM: f64 = 120.0;

/// Tempo change event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEvent {
    /// Position in score ticks
    pub tick: i64,
    /// Tempo in quarter-note beats per minute
    pub bpm: f64,
}

/// Maps score ticks to seconds and back under a list of tempo changes.
///
/// Events are kept sorted by tick and always include an event at tick 0, so
/// every tick lies in some constant-tempo span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoMap {
    /// Ticks per quarter note
    tpq: i64,
    /// Tempo changes, sorted by tick, first entry at tick 0
    events: Vec<TempoEvent>,
}

impl TempoMap {
    pub fn new(tpq: i64) -> Self {
        Self {
            tpq,
            events: vec![TempoEvent {
                tick: 0,
                bpm: DEFAULT_BPM,
            }],
        }
    }

    pub fn tpq(&self) -> i64 {
        self.tpq
    }

    pub fn events(&self) -> &[TempoEvent] {
        &self.events
    }

    /// Set the tempo from `tick` onwards. Replaces an existing event at the
    /// same tick; bpm is clamped to `[MIN_TEMPO, MAX_TEMPO]`.
    pub fn set_tempo(&mut self, tick: i64, bpm: f64) {
        let tick = tick.max(0);
        let bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        match self.events.binary_search_by_key(&tick, |e| e.tick) {
            Ok(i) => self.events[i].bpm = bpm,
            Err(i) => self.events.insert(i, TempoEvent { tick, bpm }),
        }
    }

    fn seconds_per_tick(&self, bpm: f64) -> f64 {
        60.0 / (bpm * self.tpq as f64)
    }

    /// Seconds elapsed from tick 0 to `tick`. Negative input clamps to 0.
    pub fn tick_to_time(&self, tick: i64) -> f64 {
        let tick = tick.max(0);
        let mut time = 0.0;
        for (i, event) in self.events.iter().enumerate() {
            let span_end = match self.events.get(i + 1) {
                Some(next) if next.tick < tick => next.tick,
                Some(_) | None => tick,
            };
            if span_end > event.tick {
                time += (span_end - event.tick) as f64 * self.seconds_per_tick(event.bpm);
            }
            if span_end == tick {
                break;
            }
        }
        time
    }

    /// The tick reached after `time` seconds, rounded to the nearest tick.
    /// Negative input clamps to 0.
    pub fn time_to_tick(&self, time: f64) -> i64 {
        let mut remaining = time.max(0.0);
        for (i, event) in self.events.iter().enumerate() {
            let spt = self.seconds_per_tick(event.bpm);
            if let Some(next) = self.events.get(i + 1) {
                let span_seconds = (next.tick - event.tick) as f64 * spt;
                if remaining >= span_seconds {
                    remaining -= span_seconds;
                    continue;
                }
            }
            return event.tick + (remaining / spt).round() as i64;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_flat_tempo() {
        let map = TempoMap::new(480);

        // 120 bpm: one quarter note = 0.5 s
        assert_close(map.tick_to_time(480), 0.5);
        assert_close(map.tick_to_time(1920), 2.0);
        assert_eq!(map.time_to_tick(0.5), 480);
        assert_eq!(map.time_to_tick(2.0), 1920);
    }

    #[test]
    fn test_negative_input_clamps() {
        let map = TempoMap::new(480);

        assert_eq!(map.tick_to_time(-100), 0.0);
        assert_eq!(map.time_to_tick(-1.0), 0);
    }

    #[test]
    fn test_tempo_change() {
        let mut map = TempoMap::new(480);
        map.set_tempo(960, 60.0);

        // two quarters at 120 bpm, then one quarter at 60 bpm
        assert_close(map.tick_to_time(960), 1.0);
        assert_close(map.tick_to_time(1440), 2.0);
        assert_eq!(map.time_to_tick(2.0), 1440);
        // inside the second span
        assert_eq!(map.time_to_tick(1.5), 1200);
    }

    #[test]
    fn test_round_trip_under_changes() {
        let mut map = TempoMap::new(480);
        map.set_tempo(480, 90.0);
        map.set_tempo(1920, 200.0);

        for tick in [0, 1, 479, 480, 481, 1919, 1920, 5000] {
            assert_eq!(map.time_to_tick(map.tick_to_time(tick)), tick);
        }
    }

    #[test]
    fn test_set_tempo_replaces_and_clamps() {
        let mut map = TempoMap::new(480);
        map.set_tempo(0, 1000.0);

        assert_eq!(map.events().len(), 1);
        assert_eq!(map.events()[0].bpm, MAX_TEMPO);

        map.set_tempo(0, 1.0);
        assert_eq!(map.events()[0].bpm, MIN_TEMPO);
    }

    #[test]
    fn test_monotonic() {
        let mut map = TempoMap::new(480);
        map.set_tempo(700, 240.0);

        let mut last = -1.0;
        for tick in (0..3000).step_by(50) {
            let t = map.tick_to_time(tick);
            assert!(t >= last);
            last = t;
        }
    }
}
