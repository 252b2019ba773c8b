//! Volta (numbered ending) spans.

use serde::{Deserialize, Serialize};

/// A bracketed alternate ending covering a half-open tick span.
///
/// `endings` lists the 1-based repeat passes the bracket applies to. During
/// unwinding a measure under a volta is skipped whenever the measure's own
/// playback count is not in the ending set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volta {
    /// Start of the span (inclusive), in score ticks
    pub tick: i64,
    /// End of the span (exclusive), in score ticks
    pub end_tick: i64,
    /// 1-based passes on which this ending is played
    pub endings: Vec<u32>,
}

impl Volta {
    pub fn new(tick: i64, end_tick: i64, endings: Vec<u32>) -> Self {
        Self {
            tick,
            end_tick,
            endings,
        }
    }

    /// Whether the given tick falls inside the span
    pub fn contains(&self, tick: i64) -> bool {
        tick >= self.tick && tick < self.end_tick
    }

    /// Whether this ending is played on pass `n` (1-based)
    pub fn has_ending(&self, n: u32) -> bool {
        self.endings.contains(&n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_is_half_open() {
        let volta = Volta::new(480, 960, vec![1]);

        assert!(volta.contains(480)); // start is inclusive
        assert!(volta.contains(959));
        assert!(!volta.contains(960)); // end is exclusive
        assert!(!volta.contains(479));
    }

    #[test]
    fn test_ending_membership() {
        let volta = Volta::new(0, 480, vec![1, 2]);

        assert!(volta.has_ending(1));
        assert!(volta.has_ending(2));
        assert!(!volta.has_ending(3));
        assert!(!volta.has_ending(0));
    }
}
