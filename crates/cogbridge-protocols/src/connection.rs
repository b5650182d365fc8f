//! Connection protocol definitions.
//!
//! A connection is one client's communication channel. Its lifetime is
//! owned by whoever accepted it; the kernel only keeps weak references and
//! calls [`Connection::send`] once per subscriber per notification.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::EventMessage;

/// Connection unique identifier type.
pub type ConnectionId = String;

/// Blocking round-trip transport to one client.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Returns the connection ID.
    fn id(&self) -> &ConnectionId;

    /// Deliver a message and wait for the client's answer.
    ///
    /// `Ok(None)` (or an empty string) means the client had nothing to
    /// say. Only call/response events look at the answer.
    async fn send(&self, message: &EventMessage) -> Result<Option<String>, TransportError>;

    /// Whether the client side has already gone away.
    fn is_closed(&self) -> bool {
        false
    }
}
