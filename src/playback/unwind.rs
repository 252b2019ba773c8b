//! The unwinding state machine.
//!
//! One forward walk over the measure list, restarted by repeat barlines and
//! jump directives:
//!
//! - a `:||` whose section has passes left jumps back to the matching `||:`
//!   (or to the start of the section when there is none);
//! - a volta measure is skipped on passes outside its ending set while a
//!   repeat or jump bracket is active;
//! - a jump directive fires at most once, replays from its target until its
//!   stop measure, then resumes at its continuation (or ends the piece).
//!
//! Every decision point closes the segment under construction and opens a
//! new one at the landing tick; zero-length candidates are dropped so the
//! emitted list stays strictly monotone in unwound ticks.
//!
//! Malformed input never aborts the walk: unresolved labels and missing
//! directives are logged and the walk degrades to plain advancement.

use std::collections::HashSet;

use crate::score::Score;

use super::repeat_list::RepeatSegment;

/// Unwind the score into played segments.
///
/// Resets and then maintains each measure's `playback_count`; that is the
/// only mutation.
pub(super) fn unwind_score(score: &mut Score) -> Vec<RepeatSegment> {
    Unwinder::new(score).run()
}

struct Unwinder<'s> {
    score: &'s mut Score,
    segments: Vec<RepeatSegment>,
    /// Start tick of the segment under construction
    cur_tick: i64,
    /// Measure at which the active repeat/jump bracket closes
    end_repeat: Option<usize>,
    /// Where playback resumes once a jump bracket closes
    continue_at: Option<usize>,
    /// Zero-based pass counter of the active end repeat
    loop_count: u32,
    /// Pass target of the active end repeat
    repeat_count: u32,
    /// A once-only jump bracket is executing
    is_goto: bool,
    /// Measures whose jump directive has already fired
    taken_jumps: HashSet<usize>,
}

impl<'s> Unwinder<'s> {
    fn new(score: &'s mut Score) -> Self {
        Self {
            score,
            segments: Vec::new(),
            cur_tick: 0,
            end_repeat: None,
            continue_at: None,
            loop_count: 0,
            repeat_count: 0,
            is_goto: false,
            taken_jumps: HashSet::new(),
        }
    }

    fn run(mut self) -> Vec<RepeatSegment> {
        let Some(first) = self.score.first_measure() else {
            return self.segments;
        };
        self.score.reset_playback_counts();

        let mut m = first;
        loop {
            let (tick, end_tick, end_flag, jump_flag, m_repeat_count, playback_count) = {
                let measure = self.score.measure_mut(m);
                measure.playback_count += 1;
                (
                    measure.tick,
                    measure.end_tick(),
                    measure.repeat_end,
                    measure.jump,
                    measure.repeat_count,
                    measure.playback_count,
                )
            };
            let mut do_jump = false;

            // during any D.C. or D.S. pass, internal repeats run their last
            // time through only
            if self.is_goto && end_flag {
                self.loop_count = m_repeat_count.saturating_sub(1);
            }

            if self.end_repeat.is_some() {
                let skipped_volta = self
                    .score
                    .search_volta(tick)
                    .is_some_and(|v| !v.has_ending(playback_count));
                if skipped_volta {
                    // skip measure
                    self.close_segment(tick);
                    self.cur_tick = end_tick;
                } else if jump_flag {
                    do_jump = true;
                    self.is_goto = false;
                }
            } else if jump_flag {
                // jumps are only accepted outside of other repeats
                do_jump = true;
            }

            if self.is_goto && self.end_repeat == Some(m) {
                // jump bracket closes here
                self.close_segment(end_tick);
                let Some(cont) = self.continue_at else {
                    return self.segments;
                };
                self.cur_tick = self.score.measure(cont).tick;
                m = cont;
                self.is_goto = false;
                self.end_repeat = None;
                continue;
            } else if end_flag {
                if self.end_repeat == Some(m) {
                    self.loop_count += 1;
                    if self.loop_count >= self.repeat_count {
                        self.end_repeat = None;
                        self.loop_count = 0;
                    } else {
                        m = self.jump_to_start_repeat(m);
                        continue;
                    }
                } else if self.end_repeat.is_none() {
                    if playback_count >= m_repeat_count {
                        // already serviced; the rest of the score plays
                        // straight through
                        break;
                    }
                    self.end_repeat = Some(m);
                    self.repeat_count = m_repeat_count;
                    self.loop_count = 1;
                    m = self.jump_to_start_repeat(m);
                    continue;
                }
            }

            if do_jump && !self.is_goto {
                match self.score.measure(m).first_jump().cloned() {
                    None => {
                        log::warn!("measure {m} is flagged as a jump but carries no jump directive");
                    }
                    Some(jump) if self.taken_jumps.contains(&m) => {
                        // jump only once; past it, a bracket it opened is done
                        let next = self.score.next_measure(m);
                        if self.end_repeat == self.score.search_label(&jump.play_until) {
                            self.end_repeat = None;
                        }
                        match next {
                            Some(n) => {
                                m = n;
                                continue;
                            }
                            None => break,
                        }
                    }
                    Some(jump) => {
                        self.taken_jumps.insert(m);
                        let target = self.resolve_label(&jump.jump_to);
                        self.end_repeat = self.resolve_label(&jump.play_until);
                        self.continue_at = self.resolve_label(&jump.continue_at);
                        if let (Some(target), Some(_)) = (target, self.end_repeat) {
                            self.is_goto = true;
                            self.close_segment(end_tick);
                            self.cur_tick = self.score.measure(target).tick;
                            m = target;
                            continue;
                        }
                    }
                }
            }

            match self.score.next_measure(m) {
                Some(next) => m = next,
                None => break,
            }
        }

        if let Some(last) = self.score.last_measure() {
            self.close_segment(self.score.measure(last).end_tick());
        }
        self.segments
    }

    /// Close the segment under construction at `end_tick`, dropping it when
    /// empty.
    fn close_segment(&mut self, end_tick: i64) {
        let len = end_tick - self.cur_tick;
        if len > 0 {
            self.segments.push(RepeatSegment::new(self.cur_tick, len));
        }
    }

    /// Close the current segment at the end of `m` and walk backwards to the
    /// measure the repeat restarts from: a `||:`, the first measure, or the
    /// first measure after a section break, whichever comes first.
    fn jump_to_start_repeat(&mut self, m: usize) -> usize {
        self.close_segment(self.score.measure(m).end_tick());

        let mut start = m;
        loop {
            if self.score.measure(start).repeat_start {
                break;
            }
            let Some(prev) = self.score.prev_measure(start) else {
                break;
            };
            if self.score.measure(prev).section_break {
                break;
            }
            start = prev;
        }

        self.cur_tick = self.score.measure(start).tick;
        start
    }

    fn resolve_label(&self, label: &str) -> Option<usize> {
        let found = self.score.search_label(label);
        if found.is_none() && !label.is_empty() {
            log::warn!("jump label {label:?} does not match any marker");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_with(n: usize) -> Score {
        let mut score = Score::new();
        for _ in 0..n {
            score.push_measure(480);
        }
        score
    }

    fn segment_ticks(score: &mut Score) -> Vec<(i64, i64)> {
        unwind_score(score)
            .iter()
            .map(|s| (s.tick, s.len))
            .collect()
    }

    #[test]
    fn test_empty_score() {
        let mut score = Score::new();
        assert!(unwind_score(&mut score).is_empty());
    }

    #[test]
    fn test_straight_walk_is_one_segment() {
        let mut score = score_with(4);
        assert_eq!(segment_ticks(&mut score), vec![(0, 1920)]);
    }

    #[test]
    fn test_single_measure_repeat_segments() {
        // m1 ||: m2 :|| m3
        let mut score = score_with(3);
        score.measure_mut(1).repeat_start = true;
        score.measure_mut(1).repeat_end = true;

        assert_eq!(
            segment_ticks(&mut score),
            vec![(0, 960), (480, 960)]
        );
    }

    #[test]
    fn test_playback_counts_after_unwind() {
        let mut score = score_with(3);
        score.measure_mut(1).repeat_start = true;
        score.measure_mut(1).repeat_end = true;
        unwind_score(&mut score);

        assert_eq!(score.measure(0).playback_count, 1);
        assert_eq!(score.measure(1).playback_count, 2);
        assert_eq!(score.measure(2).playback_count, 1);
    }

    #[test]
    fn test_repeat_count_one_plays_straight() {
        let mut score = score_with(3);
        score.measure_mut(1).repeat_end = true;
        score.measure_mut(1).repeat_count = 1;

        assert_eq!(segment_ticks(&mut score), vec![(0, 1440)]);
    }

    #[test]
    fn test_repeat_count_zero_never_panics() {
        let mut score = score_with(3);
        score.measure_mut(1).repeat_end = true;
        score.measure_mut(1).repeat_count = 0;

        assert_eq!(segment_ticks(&mut score), vec![(0, 1440)]);
    }
}
