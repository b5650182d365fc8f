//! In-memory connection for tests.
//!
//! [`RecordingConnection`] keeps every message it receives and answers
//! according to a script. A hook can be attached to run arbitrary code on
//! delivery, e.g. to request an interrupt from inside `interrupt_check`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use cogbridge_protocols::{Connection, ConnectionId, EventMessage, TransportError};

type DeliveryHook = Box<dyn Fn(&EventMessage) + Send + Sync>;

/// Scripted answer of a [`RecordingConnection`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer nothing.
    Silent,
    /// Answer with a fixed value.
    Answer(String),
    /// Answer only messages carrying this event name.
    AnswerFor { event: String, value: String },
    /// Fail every delivery.
    Fail(TransportError),
}

/// Connection that records what it was sent.
pub struct RecordingConnection {
    id: ConnectionId,
    messages: Mutex<Vec<EventMessage>>,
    reply: Mutex<Reply>,
    delay: Mutex<Option<Duration>>,
    hook: Mutex<Option<DeliveryHook>>,
    calls: AtomicUsize,
    closed: AtomicBool,
}

impl RecordingConnection {
    /// Create a silent connection.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Mutex::new(Vec::new()),
            reply: Mutex::new(Reply::Silent),
            delay: Mutex::new(None),
            hook: Mutex::new(None),
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Answer every message with `value`.
    pub fn answering(self, value: impl Into<String>) -> Self {
        *self.reply.lock() = Reply::Answer(value.into());
        self
    }

    /// Fail every delivery with `error`.
    pub fn failing(self, error: TransportError) -> Self {
        *self.reply.lock() = Reply::Fail(error);
        self
    }

    /// Sleep before answering.
    pub fn stalling(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Run `hook` on every delivered message, before answering.
    pub fn with_hook(self, hook: impl Fn(&EventMessage) + Send + Sync + 'static) -> Self {
        *self.hook.lock() = Some(Box::new(hook));
        self
    }

    /// Replace the reply script.
    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock() = reply;
    }

    /// Mark the client side as gone.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of `send` calls, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copy of every recorded message.
    pub fn messages(&self) -> Vec<EventMessage> {
        self.messages.lock().clone()
    }

    /// Names of the recorded events, in delivery order.
    pub fn event_names(&self) -> Vec<String> {
        self.messages.lock().iter().map(|m| m.event.clone()).collect()
    }

    /// Recorded messages for one event name.
    pub fn messages_for(&self, event: &str) -> Vec<EventMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.event == event)
            .cloned()
            .collect()
    }

    /// Forget recorded messages.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }

    /// Upcast for APIs that take `&Arc<dyn Connection>`.
    pub fn as_connection(self: &Arc<Self>) -> Arc<dyn Connection> {
        self.clone()
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn send(&self, message: &EventMessage) -> Result<Option<String>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return Err(TransportError::Disconnected);
        }

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.messages.lock().push(message.clone());
        if let Some(hook) = self.hook.lock().as_ref() {
            hook(message);
        }

        let reply = self.reply.lock().clone();
        match reply {
            Reply::Silent => Ok(None),
            Reply::Answer(value) => Ok(Some(value)),
            Reply::AnswerFor { event, value } if event == message.event => Ok(Some(value)),
            Reply::AnswerFor { .. } => Ok(None),
            Reply::Fail(error) => Err(error),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
