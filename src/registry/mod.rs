//! Change tracking for painted frames.

mod core;

pub use core::FrameRegistry;
