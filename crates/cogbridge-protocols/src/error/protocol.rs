//! Protocol errors.

use thiserror::Error;

use crate::event::EventCategory;

/// A malformed request from the command layer.
///
/// Reported to the caller; never fatal to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Event {event} does not belong to the {expected} family")]
    WrongFamily {
        event: String,
        expected: EventCategory,
    },

    #[error("Connection already closed: {0}")]
    ConnectionClosed(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}
