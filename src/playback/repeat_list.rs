//! The unwound segment list and its coordinate queries.

use crate::score::Score;
use crate::tempo::TempoMap;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

use super::unwind::unwind_score;

/// One contiguous run of written measures, played once.
///
/// `tick`/`len` locate the run in the written score; `utick`/`utime` locate
/// it in the unwound timeline. `time_offset` is the difference between the
/// run's unwound start time and the written score time at `tick`, so a
/// single tempo-map lookup plus the offset converts any position inside the
/// run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RepeatSegment {
    /// Start in score ticks
    pub tick: i64,
    /// Length in ticks
    pub len: i64,
    /// Start in unwound ticks
    pub utick: i64,
    /// Start in unwound seconds
    pub utime: f64,
    /// `utime` minus the score time at `tick`
    pub time_offset: f64,
}

impl RepeatSegment {
    pub(crate) fn new(tick: i64, len: i64) -> Self {
        Self {
            tick,
            len,
            ..Self::default()
        }
    }

    /// First unwound tick after the segment
    pub fn end_utick(&self) -> i64 {
        self.utick + self.len
    }
}

/// The flattened playback order of a score.
///
/// Rebuilt by [`unwind`](RepeatList::unwind); queried by a playback clock.
/// The two cursor fields remember where the previous query landed so that
/// monotonically advancing queries stay O(1); they are pure hints and never
/// affect results.
///
/// The cursors make the read queries non-reentrant: concurrent readers must
/// hold their own lists or synchronize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepeatList {
    segments: Vec<RepeatSegment>,
    /// Segment hint for utick-domain queries
    #[serde(skip)]
    idx1: Cell<usize>,
    /// Segment hint for time-domain queries
    #[serde(skip)]
    idx2: Cell<usize>,
}

impl RepeatList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the list from the score's repeat structure.
    ///
    /// Resets and then increments every measure's `playback_count`; that is
    /// the only score mutation. Idempotent for an unchanged score.
    pub fn unwind(&mut self, score: &mut Score, tempo: &TempoMap) {
        self.segments = unwind_score(score);
        self.idx1.set(0);
        self.idx2.set(0);
        self.update(tempo);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("repeat list ({} segments):", self.segments.len());
            for s in &self.segments {
                log::debug!(
                    "  tick {:6} len {:6} utick {:6} utime {:9.3} offset {:9.3}",
                    s.tick,
                    s.len,
                    s.utick,
                    s.utime,
                    s.time_offset
                );
            }
        }
    }

    /// Stamp `utick`, `utime`, and `time_offset` on every segment in one
    /// forward pass.
    fn update(&mut self, tempo: &TempoMap) {
        let mut utick = 0;
        let mut t = 0.0;
        for s in &mut self.segments {
            s.utick = utick;
            s.utime = t;
            let ct = tempo.tick_to_time(s.tick);
            s.time_offset = t - ct;
            utick += s.len;
            t += tempo.tick_to_time(s.tick + s.len) - ct;
        }
    }

    pub fn segments(&self) -> &[RepeatSegment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RepeatSegment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&RepeatSegment> {
        self.segments.last()
    }

    /// Total unwound length in ticks, 0 when empty
    pub fn ticks(&self) -> i64 {
        self.segments.last().map_or(0, RepeatSegment::end_utick)
    }

    /// Convert an unwound tick to the written score tick it plays.
    ///
    /// Negative input clamps to 0; input past the end extrapolates from the
    /// last segment; an empty list echoes the input.
    pub fn utick_to_tick(&self, utick: i64) -> i64 {
        let n = self.segments.len();
        if n == 0 {
            return utick;
        }
        if utick < 0 {
            return 0;
        }
        let hint = self.idx1.get();
        let start = if hint < n && utick >= self.segments[hint].utick {
            hint
        } else {
            0
        };
        for i in start..n {
            let s = &self.segments[i];
            if utick >= s.utick && (i + 1 == n || utick < self.segments[i + 1].utick) {
                self.idx1.set(i);
                return utick - (s.utick - s.tick);
            }
        }
        debug_assert!(false, "utick {utick} not found in repeat list");
        0
    }

    /// Convert a written score tick to the unwound tick of its first play.
    ///
    /// A tick covered by no segment extrapolates from the last segment; an
    /// empty list echoes the input.
    pub fn tick_to_utick(&self, tick: i64) -> i64 {
        for s in &self.segments {
            if tick >= s.tick && tick < s.tick + s.len {
                return s.utick + (tick - s.tick);
            }
        }
        match self.segments.last() {
            Some(last) => last.utick + (tick - last.tick),
            None => tick,
        }
    }

    /// Convert an unwound tick to unwound seconds
    pub fn utick_to_utime(&self, utick: i64, tempo: &TempoMap) -> f64 {
        let n = self.segments.len();
        let hint = self.idx1.get();
        let start = if hint < n && utick >= self.segments[hint].utick {
            hint
        } else {
            0
        };
        for i in start..n {
            let s = &self.segments[i];
            if utick >= s.utick && (i + 1 == n || utick < self.segments[i + 1].utick) {
                let tick = utick - (s.utick - s.tick);
                return tempo.tick_to_time(tick) + s.time_offset;
            }
        }
        0.0
    }

    /// Convert unwound seconds to the unwound tick reached at that time
    pub fn utime_to_utick(&self, time: f64, tempo: &TempoMap) -> i64 {
        let n = self.segments.len();
        let hint = self.idx2.get();
        let start = if hint < n && time >= self.segments[hint].utime {
            hint
        } else {
            0
        };
        for i in start..n {
            let s = &self.segments[i];
            if time >= s.utime && (i + 1 == n || time < self.segments[i + 1].utime) {
                self.idx2.set(i);
                return tempo.time_to_tick(time - s.time_offset) + (s.utick - s.tick);
            }
        }
        debug_assert!(n == 0, "time {time} not found in repeat list");
        0
    }
}

impl<'a> IntoIterator for &'a RepeatList {
    type Item = &'a RepeatSegment;
    type IntoIter = std::slice::Iter<'a, RepeatSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
