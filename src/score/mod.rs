//! The score as the unwinder traverses it.
//!
//! [`Score`] owns the measure list and the volta spans and answers the
//! lookups the unwinder needs: ordered traversal, label search, and
//! volta-at-tick search. Measures are identified by their zero-based index
//! in the list.
//!
//! Scores built through the methods here are structurally sound by
//! construction ([`Score::push_measure`] appends contiguously). Scores that
//! arrive through deserialization are not; [`Score::validate`] checks the
//! structural invariants for that path. The unwinder itself never requires a
//! valid score; it degrades to a straight walk on malformed input.

use crate::models::{Directive, Jump, Marker, Measure, Volta};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("measure {index} starts at tick {tick} but the previous measure ends at tick {expected}")]
    MisalignedMeasure {
        index: usize,
        tick: i64,
        expected: i64,
    },
    #[error("measure {index} has non-positive length {len}")]
    EmptyMeasure { index: usize, len: i64 },
    #[error("volta [{tick}, {end_tick}) lies outside the score")]
    VoltaOutOfRange { tick: i64, end_tick: i64 },
    #[error("measure {index} has a repeat end with play count 0")]
    ZeroRepeatCount { index: usize },
    #[error("measure {index} is flagged as a jump but carries no jump directive")]
    MissingJump { index: usize },
}

/// A score reduced to what playback unwinding needs: measures in order plus
/// volta spans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Score {
    measures: Vec<Measure>,
    voltas: Vec<Volta>,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a measure of the given tick length at the current end of the
    /// score and return its index.
    pub fn push_measure(&mut self, len: i64) -> usize {
        let tick = self.end_tick();
        self.measures.push(Measure::new(tick, len));
        self.measures.len() - 1
    }

    /// Attach a marker with the given label to a measure
    pub fn add_marker(&mut self, measure: usize, label: &str) {
        self.measures[measure]
            .directives
            .push(Directive::Marker(Marker::new(label)));
    }

    /// Attach a jump directive to a measure and set its jump flag
    pub fn add_jump(&mut self, measure: usize, jump: Jump) {
        self.measures[measure].jump = true;
        self.measures[measure].directives.push(Directive::Jump(jump));
    }

    /// Add a volta spanning the measures `first..=last`, playing on the
    /// given 1-based passes.
    pub fn add_volta(&mut self, first: usize, last: usize, endings: &[u32]) {
        let tick = self.measures[first].tick;
        let end_tick = self.measures[last].end_tick();
        self.voltas.push(Volta::new(tick, end_tick, endings.to_vec()));
    }

    pub fn measure(&self, index: usize) -> &Measure {
        &self.measures[index]
    }

    pub fn measure_mut(&mut self, index: usize) -> &mut Measure {
        &mut self.measures[index]
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn voltas(&self) -> &[Volta] {
        &self.voltas
    }

    /// First tick after the last measure, 0 for an empty score
    pub fn end_tick(&self) -> i64 {
        self.measures.last().map_or(0, Measure::end_tick)
    }

    pub fn first_measure(&self) -> Option<usize> {
        if self.measures.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn last_measure(&self) -> Option<usize> {
        self.measures.len().checked_sub(1)
    }

    pub fn next_measure(&self, index: usize) -> Option<usize> {
        if index + 1 < self.measures.len() {
            Some(index + 1)
        } else {
            None
        }
    }

    pub fn prev_measure(&self, index: usize) -> Option<usize> {
        index.checked_sub(1)
    }

    /// Resolve a marker label to the measure carrying it.
    ///
    /// `"start"` and `"end"` resolve to the first and last measure without
    /// consulting any marker; the empty string never resolves. Otherwise the
    /// first matching marker in score order wins, directives in attachment
    /// order within a measure.
    pub fn search_label(&self, label: &str) -> Option<usize> {
        match label {
            "" => return None,
            "start" => return self.first_measure(),
            "end" => return self.last_measure(),
            _ => {}
        }
        self.measures.iter().position(|m| {
            m.directives.iter().any(|d| match d {
                Directive::Marker(marker) => marker.label == label,
                Directive::Jump(_) => false,
            })
        })
    }

    /// The first volta whose span contains the given tick
    pub fn search_volta(&self, tick: i64) -> Option<&Volta> {
        self.voltas.iter().find(|v| v.contains(tick))
    }

    /// The measure whose span contains the given tick
    pub fn tick_to_measure(&self, tick: i64) -> Option<usize> {
        self.measures
            .iter()
            .position(|m| tick >= m.tick && tick < m.end_tick())
    }

    pub(crate) fn reset_playback_counts(&mut self) {
        for m in &mut self.measures {
            m.playback_count = 0;
        }
    }

    /// Check the structural invariants the building methods guarantee.
    ///
    /// Intended for scores that arrive through deserialization. Returns the
    /// first problem found.
    pub fn validate(&self) -> Result<(), ScoreError> {
        let mut expected = 0;
        for (index, m) in self.measures.iter().enumerate() {
            if m.len <= 0 {
                return Err(ScoreError::EmptyMeasure { index, len: m.len });
            }
            if m.tick != expected {
                return Err(ScoreError::MisalignedMeasure {
                    index,
                    tick: m.tick,
                    expected,
                });
            }
            if m.repeat_end && m.repeat_count == 0 {
                return Err(ScoreError::ZeroRepeatCount { index });
            }
            if m.jump && m.first_jump().is_none() {
                return Err(ScoreError::MissingJump { index });
            }
            expected = m.end_tick();
        }
        for v in &self.voltas {
            if v.tick < 0 || v.end_tick > self.end_tick() || v.tick >= v.end_tick {
                return Err(ScoreError::VoltaOutOfRange {
                    tick: v.tick,
                    end_tick: v.end_tick,
                });
            }
        }
        Ok(())
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

    #[test]
    fn test_push_measure_is_contiguous() {
        let score = score_with(3);

        assert_eq!(score.measure(0).tick, 0);
        assert_eq!(score.measure(1).tick, 480);
        assert_eq!(score.measure(2).tick, 960);
        assert_eq!(score.end_tick(), 1440);
        assert!(score.validate().is_ok());
    }

    #[test]
    fn test_traversal() {
        let score = score_with(2);

        assert_eq!(score.first_measure(), Some(0));
        assert_eq!(score.last_measure(), Some(1));
        assert_eq!(score.next_measure(0), Some(1));
        assert_eq!(score.next_measure(1), None);
        assert_eq!(score.prev_measure(1), Some(0));
        assert_eq!(score.prev_measure(0), None);

        let empty = Score::new();
        assert_eq!(empty.first_measure(), None);
        assert_eq!(empty.last_measure(), None);
    }

    #[test]
    fn test_search_label_sentinels() {
        let mut score = score_with(4);
        score.add_marker(2, "segno");

        assert_eq!(score.search_label("start"), Some(0));
        assert_eq!(score.search_label("end"), Some(3));
        assert_eq!(score.search_label("segno"), Some(2));
        assert_eq!(score.search_label("coda"), None);
        assert_eq!(score.search_label(""), None);
    }

    #[test]
    fn test_search_label_first_match_wins() {
        let mut score = score_with(3);
        score.add_marker(1, "segno");
        score.add_marker(2, "segno");

        assert_eq!(score.search_label("segno"), Some(1));
    }

    #[test]
    fn test_search_volta() {
        let mut score = score_with(4);
        score.add_volta(1, 2, &[1]);

        assert_eq!(score.search_volta(0), None);
        assert!(score.search_volta(480).is_some());
        assert!(score.search_volta(1439).is_some());
        assert_eq!(score.search_volta(1440), None);
    }

    #[test]
    fn test_tick_to_measure() {
        let score = score_with(3);

        assert_eq!(score.tick_to_measure(0), Some(0));
        assert_eq!(score.tick_to_measure(479), Some(0));
        assert_eq!(score.tick_to_measure(480), Some(1));
        assert_eq!(score.tick_to_measure(1440), None);
        assert_eq!(score.tick_to_measure(-1), None);
    }

    #[test]
    fn test_validate_rejects_missing_jump_directive() {
        let mut score = score_with(2);
        score.measure_mut(1).jump = true;

        assert_eq!(
            score.validate(),
            Err(ScoreError::MissingJump { index: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_volta_outside_score() {
        let mut score = score_with(2);
        score.add_volta(1, 1, &[1]);
        score.voltas[0].end_tick = 5000;

        assert!(matches!(
            score.validate(),
            Err(ScoreError::VoltaOutOfRange { .. })
        ));
    }
}
