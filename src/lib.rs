//! Playback unwinding core for a music notation engine.
//!
//! A score is written with repeat barlines, voltas (numbered endings),
//! segno/coda marks, and D.C./D.S. jump directives. Before anything can be
//! played back, those annotations have to be flattened into the sequence of
//! measures a performer would actually read out. This crate owns that
//! flattening and the coordinate bookkeeping that comes with it:
//!
//! ```text
//! Score                  Unwinder               RepeatList
//! (measures, voltas,     (state machine         (ordered RepeatSegments +
//!  markers, jumps)        over the measure       tick/utick/time queries)
//!                         walk)
//!
//! Score ───────────────▶ unwind ──────────────▶ RepeatList ◀── playback clock
//!                                                   │
//!                                                TempoMap
//! ```
//!
//! Two tick domains coexist after unwinding: *score ticks* (positions in the
//! written score) and *unwound ticks* ("uticks", positions in the flattened
//! playback timeline). [`RepeatList`] converts between them, and between
//! uticks and real-time seconds under a [`TempoMap`].

pub mod models;
pub mod playback;
pub mod score;
pub mod tempo;

// Re-export commonly used types
pub use models::{Directive, Jump, Marker, Measure, Volta};
pub use playback::{RepeatList, RepeatSegment};
pub use score::{Score, ScoreError};
pub use tempo::{TempoEvent, TempoMap};
