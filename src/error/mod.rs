//! Error module orchestrator.

mod types;

pub use types::{BlocksError, ConfigurationError, Result, SchedulerError};
