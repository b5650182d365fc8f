//! Subscriber notification.
//!
//! The notifier walks a snapshot of one event's subscriber list and calls
//! each connection in order, awaiting every round trip before moving on.
//! It never touches the registry itself: what happened to each subscriber
//! is reported back in a [`NotifyReport`] and the hub decides what to drop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, trace};

use cogbridge_protocols::{Connection, ConnectionId, EventMessage, TransportError};

use crate::metrics::HubMetrics;
use crate::registry::SubscriberHandle;

/// How a notification walks the subscriber list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Contact every subscriber; answers are ignored.
    Broadcast,
    /// Contact subscribers in order until one answers with a value.
    FirstResponse,
}

/// What happened while walking a subscriber list.
#[derive(Debug, Default)]
pub struct NotifyReport {
    /// Subscribers whose `send` returned successfully.
    pub delivered: usize,
    /// Subscribers whose `send` failed or timed out.
    pub failed: Vec<(ConnectionId, TransportError)>,
    /// Subscribers whose connection no longer exists or is closed.
    pub gone: Vec<ConnectionId>,
    /// First non-empty answer, with the connection that gave it.
    pub response: Option<(ConnectionId, String)>,
}

impl NotifyReport {
    /// Connections that failed or disappeared.
    pub fn lost(&self) -> impl Iterator<Item = &ConnectionId> {
        self.gone.iter().chain(self.failed.iter().map(|(id, _)| id))
    }

    /// Whether every subscriber in scope was reached without trouble.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.gone.is_empty()
    }
}

/// Delivers messages to subscriber snapshots.
pub struct Notifier {
    transport_timeout: Option<Duration>,
    metrics: Arc<HubMetrics>,
}

impl Notifier {
    /// Create a notifier bounding each round trip by `transport_timeout`.
    pub fn new(transport_timeout: Option<Duration>, metrics: Arc<HubMetrics>) -> Self {
        Self {
            transport_timeout,
            metrics,
        }
    }

    /// Configured round-trip bound.
    pub fn transport_timeout(&self) -> Option<Duration> {
        self.transport_timeout
    }

    /// Walk `subscribers` in order.
    ///
    /// An empty list returns immediately without touching any transport.
    pub async fn notify(
        &self,
        subscribers: &[SubscriberHandle],
        message: &EventMessage,
        mode: DispatchMode,
    ) -> NotifyReport {
        let mut report = NotifyReport::default();

        for handle in subscribers {
            let Some(connection) = handle.upgrade() else {
                trace!(connection = %handle.id(), "Subscriber gone before delivery");
                report.gone.push(handle.id().clone());
                continue;
            };
            if connection.is_closed() {
                trace!(connection = %handle.id(), "Subscriber closed before delivery");
                report.gone.push(handle.id().clone());
                continue;
            }

            match self.deliver(connection.as_ref(), message).await {
                Ok(answer) => {
                    report.delivered += 1;
                    if mode == DispatchMode::FirstResponse {
                        if let Some(value) = answer {
                            report.response = Some((handle.id().clone(), value));
                            break;
                        }
                    }
                }
                Err(error) => {
                    debug!(
                        connection = %handle.id(),
                        event = %message.event,
                        error = %error,
                        "Subscriber delivery failed"
                    );
                    report.failed.push((handle.id().clone(), error));
                }
            }
        }

        report
    }

    /// One bounded round trip. Empty answers are normalised to `None`.
    async fn deliver(
        &self,
        connection: &dyn Connection,
        message: &EventMessage,
    ) -> Result<Option<String>, TransportError> {
        self.metrics.record_transport_call();

        let result = match self.transport_timeout {
            Some(limit) => match timeout(limit, connection.send(message)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout {
                    after_ms: millis(limit),
                }),
            },
            None => connection.send(message).await,
        };

        if result.is_err() {
            self.metrics.record_transport_failure();
        }
        result.map(|answer| answer.filter(|value| !value.is_empty()))
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}
