//! Transport errors.

use thiserror::Error;

/// A subscriber's round trip failed.
///
/// Always recovered locally by the notifier; never unwinds a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection disconnected")]
    Disconnected,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Round trip timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Message rejected: {0}")]
    Rejected(String),
}
