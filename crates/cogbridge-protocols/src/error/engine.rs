//! Engine errors.

use thiserror::Error;

/// Failure reported by the reasoning engine while stepping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Step failed for agent {agent}: {message}")]
    StepFailed { agent: String, message: String },

    #[error("Internal engine error: {0}")]
    Internal(String),
}
