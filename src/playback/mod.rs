//! Repeat unwinding and the unwound playback timeline.
//!
//! ```text
//! Score (written order)          RepeatList (played order)
//!
//! m1 ||: m2 m3 :|| m4   ──▶   [m1 m2 m3][m2 m3 m4]
//!                              tick/len   tick/len
//!                              utick 0    utick 3·len
//! ```
//!
//! [`RepeatList::unwind`] walks the score once, honoring repeat barlines,
//! voltas, and jump directives, and emits [`RepeatSegment`]s: contiguous
//! runs of written measures played once. Concatenating the segments yields
//! the performed score; their `utick`/`utime` fields anchor the unwound
//! timeline that the conversion queries operate on.

mod repeat_list;
mod unwind;

pub use repeat_list::{RepeatList, RepeatSegment};
