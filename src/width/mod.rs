//! Width module orchestrator.

mod utils;

pub use utils::{char_width, display_width, plain_width};
