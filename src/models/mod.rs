//! Score-side data model consumed by the unwinder.
//!
//! Everything here is plain data: measures with their repeat flags and
//! attached directives, and the volta spans that select measures by repeat
//! pass. The unwinder borrows these from the score and mutates nothing but
//! the per-measure playback counter.

pub mod measure;
pub mod volta;

pub use measure::{Directive, Jump, Marker, Measure};
pub use volta::Volta;
