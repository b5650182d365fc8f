//! Error types for the run scheduler.

use thiserror::Error;

use cogbridge_protocols::EngineError;

use crate::request::RunGranularity;

/// Reasons a run can end in [`RunOutcome::Error`](crate::RunOutcome::Error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// The agent selection resolved to nothing.
    #[error("No agents to run")]
    NoAgents,

    /// A named agent does not exist.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Another run is scheduling or executing.
    #[error("A run is already in progress")]
    AlreadyRunning,

    /// Counted runs need a positive count.
    #[error("Run count must be positive for {0} runs")]
    InvalidCount(RunGranularity),

    /// The engine failed while stepping.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Result type for scheduler operations.
pub type RunResult<T> = Result<T, RunError>;
