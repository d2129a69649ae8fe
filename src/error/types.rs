use thiserror::Error;

use crate::logging::LoggingError;

/// Unified result type for the blocks engine.
pub type Result<T> = std::result::Result<T, BlocksError>;

/// Errors surfaced by the layout and rendering engine.
#[derive(Debug, Error)]
pub enum BlocksError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("terminal backend error: {0}")]
    Terminal(String),
    #[error("render cycle panicked: {0}")]
    Panicked(String),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Invalid node, size preference or arrangement declarations.
///
/// These are raised at construction or build time, before anything is
/// mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("invalid justification `{0}`")]
    InvalidJustification(String),
    #[error("size preference maximum {max} is below minimum {min}")]
    InvalidSizePreference { min: u16, max: u16 },
    #[error("row and column groups must not be empty")]
    EmptyGroup,
    #[error("identifier `{0}` appears more than once in the arrangement")]
    DuplicateIdentifier(String),
    #[error("identifier `{0}` has no node in the arrangement map")]
    MissingNode(String),
    #[error("identifier `{0}` is not part of the arrangement")]
    UnknownIdentifier(String),
    #[error("malformed arrangement shape: {0}")]
    MalformedShape(String),
    #[error("node `{0}` is placed inside its own arrangement")]
    Cycle(String),
    #[error("operation requires a leaf node")]
    NotALeaf,
    #[error("operation requires a composite node")]
    NotAComposite,
}

/// Lifecycle misuse of the runner.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("runner already started")]
    AlreadyStarted,
    #[error("runner is stopped and cannot be restarted")]
    Stopped,
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
