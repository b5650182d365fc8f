//! JSON-lines client connection on standard output.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use tracing::debug;

use cogbridge_protocols::{
    params, Connection, ConnectionId, EventMessage, RhsEvent, SystemEvent, TransportError,
};
use cogbridge_runloop::InterruptHandle;

/// Writes every delivered message as one JSON line.
///
/// Answers RHS calls with a fixed value and can request an interrupt once
/// the run has taken a given number of steps.
pub(crate) struct StdoutConnection {
    id: ConnectionId,
    out: Mutex<Stdout>,
    closed: AtomicBool,
    rhs_answer: Option<String>,
    interrupt: Option<(InterruptHandle, u64)>,
}

impl StdoutConnection {
    pub(crate) fn new(id: impl Into<ConnectionId>) -> Self {
        Self {
            id: id.into(),
            out: Mutex::new(tokio::io::stdout()),
            closed: AtomicBool::new(false),
            rhs_answer: None,
            interrupt: None,
        }
    }

    pub(crate) fn with_rhs_answer(mut self, answer: Option<String>) -> Self {
        self.rhs_answer = answer;
        self
    }

    pub(crate) fn interrupting_after(mut self, handle: InterruptHandle, steps: u64) -> Self {
        self.interrupt = Some((handle, steps));
        self
    }

    fn answer(&self, message: &EventMessage) -> Option<String> {
        if message.event == RhsEvent::RhsUserFunction.as_str() {
            return self.rhs_answer.clone();
        }

        if message.event == SystemEvent::InterruptCheck.as_str() {
            if let Some((handle, limit)) = &self.interrupt {
                let steps = message
                    .param(params::COUNT)
                    .and_then(|count| count.parse::<u64>().ok())
                    .unwrap_or(0);
                if steps >= *limit {
                    debug!(steps, "Requesting interrupt");
                    handle.request();
                }
            }
        }
        None
    }
}

#[async_trait]
impl Connection for StdoutConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn send(&self, message: &EventMessage) -> Result<Option<String>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Disconnected);
        }

        let mut line = serde_json::to_string(message)
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        line.push('\n');

        let mut out = self.out.lock().await;
        if let Err(e) = out.write_all(line.as_bytes()).await {
            self.closed.store(true, Ordering::SeqCst);
            return Err(TransportError::SendFailed(e.to_string()));
        }
        out.flush()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        drop(out);

        Ok(self.answer(message))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
