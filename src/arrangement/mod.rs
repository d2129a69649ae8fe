//! Row/column arrangements of identified nodes.

mod core;

pub use core::{Arrangement, NodeId, Shape};
