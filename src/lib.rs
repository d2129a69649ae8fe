//! Terminal block layout engine.
//!
//! A screen is a tree of [`Node`]s: text and fill leaves, and composites that
//! place identified children in nested rows and columns ([`Arrangement`]).
//! Each node carries width and height [`SizePref`]s; a [`Plot`] merges them
//! bottom-up and divides the terminal top-down into one rectangle per leaf.
//! A [`Runner`] owns the terminal on a single render thread and repaints
//! whenever a node publishes a change on its [`DirtyBus`].

pub mod arrangement;
pub mod bus;
pub mod error;
pub mod geometry;
pub mod justify;
pub mod layout;
pub mod line;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod terminal;
pub mod width;

pub use arrangement::{Arrangement, NodeId, Shape};
pub use bus::{BusStats, DirtyBus, Subscription, Waker};
pub use error::{BlocksError, ConfigurationError, Result, SchedulerError};
pub use geometry::{Rect, Size};
pub use justify::{HJust, VJust};
pub use layout::{Axis, Bound, Frame, Placement, Plot, Resolved, SizePref, divvy};
pub use line::{Line, Markup};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, NullSink,
};
pub use metrics::{MetricSnapshot, RunnerMetrics};
pub use node::{FrameStyle, Framed, Node, NodeBuilder, NodeKind};
pub use registry::FrameRegistry;
pub use render::{PaintStats, Painter, RepaintMode};
pub use runtime::{
    InputBinding, LayoutCommand, Runner, RunnerConfig, RunnerState, StopHandle,
};
pub use terminal::{
    CrosstermKeys, CrosstermTerminal, Key, KeySource, MemoryKeys, MemoryTerminal, StyleSheet,
    Terminal,
};
pub use width::display_width;
