//! Measures and the directives attached to them.
//!
//! A measure is the atomic unit of the playback walk: a tick span, the
//! repeat flags carried by its barlines, and an ordered list of attached
//! directives (markers that label the measure, jumps that leave it).

use serde::{Deserialize, Serialize};

/// One bar of music as the unwinder sees it.
///
/// Positions and lengths are integer score ticks. The repeat flags mirror
/// the barlines around the measure: `repeat_start` for a `||:` at its left,
/// `repeat_end` for a `:||` at its right, and `jump` when a jump directive
/// (D.C., D.S., ...) is anchored to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Starting position in score ticks
    pub tick: i64,
    /// Length in score ticks
    pub len: i64,
    /// A repeat section starts at this measure (`||:`)
    pub repeat_start: bool,
    /// A repeat section ends at this measure (`:||`)
    pub repeat_end: bool,
    /// A jump directive is anchored to this measure
    pub jump: bool,
    /// How many times a `:||` at this measure plays its section in total.
    /// Meaningful only with `repeat_end`; 2 for a plain repeat barline.
    pub repeat_count: u32,
    /// A section break follows this measure
    pub section_break: bool,
    /// How often the unwinder has visited this measure. Reset at the start
    /// of every unwind, incremented once per physical visit.
    #[serde(skip)]
    pub playback_count: u32,
    /// Markers and jumps attached to this measure, in attachment order
    pub directives: Vec<Directive>,
}

impl Measure {
    pub fn new(tick: i64, len: i64) -> Self {
        Self {
            tick,
            len,
            repeat_start: false,
            repeat_end: false,
            jump: false,
            repeat_count: 2,
            section_break: false,
            playback_count: 0,
            directives: Vec::new(),
        }
    }

    /// First tick after the measure
    pub fn end_tick(&self) -> i64 {
        self.tick + self.len
    }

    /// The first jump directive attached to this measure, if any
    pub fn first_jump(&self) -> Option<&Jump> {
        self.directives.iter().find_map(|d| match d {
            Directive::Jump(jump) => Some(jump),
            Directive::Marker(_) => None,
        })
    }
}

/// An element attached to a measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    Jump(Jump),
    Marker(Marker),
}

/// A once-only jump directive (D.C., D.S., and friends).
///
/// All three fields are marker labels resolved against the score when the
/// jump fires: `jump_to` names where playback restarts, `play_until` names
/// the measure at which the jump's effect ends, and `continue_at` names
/// where playback resumes afterwards (empty when the piece simply ends at
/// `play_until`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jump {
    pub jump_to: String,
    pub play_until: String,
    pub continue_at: String,
}

impl Jump {
    pub fn new(jump_to: &str, play_until: &str, continue_at: &str) -> Self {
        Self {
            jump_to: jump_to.to_string(),
            play_until: play_until.to_string(),
            continue_at: continue_at.to_string(),
        }
    }

    /// D.C.: back to the top, play to the end
    pub fn da_capo() -> Self {
        Self::new("start", "end", "")
    }

    /// D.C. al Fine: back to the top, play to the fine mark
    pub fn da_capo_al_fine() -> Self {
        Self::new("start", "fine", "")
    }

    /// D.C. al Coda: back to the top, play to the to-coda mark, resume at
    /// the coda
    pub fn da_capo_al_coda() -> Self {
        Self::new("start", "coda", "codab")
    }

    /// D.S.: back to the segno, play to the end
    pub fn dal_segno() -> Self {
        Self::new("segno", "end", "")
    }

    /// D.S. al Fine: back to the segno, play to the fine mark
    pub fn dal_segno_al_fine() -> Self {
        Self::new("segno", "fine", "")
    }

    /// D.S. al Coda: back to the segno, play to the to-coda mark, resume at
    /// the coda
    pub fn dal_segno_al_coda() -> Self {
        Self::new("segno", "coda", "codab")
    }
}

/// A named anchor on a measure (segno, coda, fine, or a user label).
///
/// The labels `"start"` and `"end"` are reserved: label search resolves them
/// to the first and last measure without consulting any marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
}

impl Marker {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }

    /// The segno sign jumped to by D.S. directives
    pub fn segno() -> Self {
        Self::new("segno")
    }

    /// The "To Coda" mark ending an al-coda jump's replay span
    pub fn to_coda() -> Self {
        Self::new("coda")
    }

    /// The coda sign where playback resumes after an al-coda jump
    pub fn coda() -> Self {
        Self::new("codab")
    }

    /// The fine mark ending an al-fine jump
    pub fn fine() -> Self {
        Self::new("fine")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_tick() {
        let m = Measure::new(960, 480);
        assert_eq!(m.end_tick(), 1440);
    }

    #[test]
    fn test_first_jump_skips_markers() {
        let mut m = Measure::new(0, 480);
        m.directives.push(Directive::Marker(Marker::segno()));
        m.directives.push(Directive::Jump(Jump::da_capo()));
        m.directives
            .push(Directive::Jump(Jump::new("x", "y", "")));

        // first jump in attachment order, markers ignored
        assert_eq!(m.first_jump(), Some(&Jump::da_capo()));
    }

    #[test]
    fn test_first_jump_none() {
        let mut m = Measure::new(0, 480);
        m.directives.push(Directive::Marker(Marker::fine()));
        assert_eq!(m.first_jump(), None);
    }

    #[test]
    fn test_jump_presets() {
        assert_eq!(
            Jump::dal_segno_al_coda(),
            Jump::new("segno", "coda", "codab")
        );
        assert_eq!(Jump::da_capo_al_fine(), Jump::new("start", "fine", ""));
        assert_eq!(Jump::dal_segno().continue_at, "");
    }
}
