//! Screen regions: text leaves, fills, composites and frames.

mod core;
mod frame;

pub use core::{Node, NodeBuilder, NodeKind};
pub(crate) use core::Snapshot;
pub use frame::{FrameStyle, Framed};
