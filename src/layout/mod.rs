//! Size preferences, space partitioning and the plot tree.
//!
//! `core` holds the per-axis arithmetic (preference merge and `divvy`);
//! `plot` applies it to a node tree to produce positioned frames.

mod core;
mod plot;

pub use core::{Axis, Bound, Resolved, SizePref, divvy};
pub use plot::{Frame, Placement, Plot, ROOT_PATH};
