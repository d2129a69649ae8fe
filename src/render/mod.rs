//! Frame painting.

mod core;

pub use core::{PaintStats, Painter, RepaintMode};
