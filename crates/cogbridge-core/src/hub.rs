//! Event hub.
//!
//! The hub is the explicitly constructed context that ties the
//! subscription registry, the notifier and the engine's event-source hooks
//! together. There is one hub per kernel; everything that emits or listens
//! for events goes through it.
//!
//! Lost connections are handled here: a subscriber that fails during a
//! broadcast, or whose connection has been dropped, is removed from every
//! event, engine sources whose last listener disappeared are disabled, and
//! the remaining `after_connection_lost` listeners are told about it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use cogbridge_protocols::{
    params, Connection, ConnectionId, EventId, EventMessage, EventSourceControl,
    NoopSourceControl, ProtocolError, SystemEvent,
};

use crate::adapters::{
    AgentEvents, ProductionEvents, RunEvents, StringEvents, SystemEvents, UpdateEvents,
};
use crate::config::HubConfig;
use crate::metrics::HubMetrics;
use crate::notifier::{DispatchMode, Notifier, NotifyReport};
use crate::registry::{SubscriberHandle, SubscriptionRegistry};
use crate::rhs::RhsEvents;

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;

/// Result of one dispatch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// Subscribers that were reached.
    pub delivered: usize,
    /// Connections removed because they failed or disappeared.
    pub dropped: Vec<ConnectionId>,
    /// First non-empty answer (first-response mode only).
    pub response: Option<String>,
}

/// Kernel event context.
pub struct EventHub {
    registry: SubscriptionRegistry,
    notifier: Notifier,
    sources: Arc<dyn EventSourceControl>,
    config: HubConfig,
    metrics: Arc<HubMetrics>,
    /// Serialises registry membership changes with source toggles.
    membership: Mutex<()>,
}

impl EventHub {
    /// Create a hub that toggles `sources` on first/last subscriber.
    pub fn new(sources: Arc<dyn EventSourceControl>, config: HubConfig) -> Self {
        let metrics = Arc::new(HubMetrics::new());
        Self {
            registry: SubscriptionRegistry::new(),
            notifier: Notifier::new(config.transport_timeout, metrics.clone()),
            sources,
            config,
            metrics,
            membership: Mutex::new(()),
        }
    }

    /// Create a hub with default configuration and no engine hooks.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(NoopSourceControl), HubConfig::default())
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<HubMetrics> {
        &self.metrics
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Subscribe a connection to an event.
    ///
    /// Returns `true` if this was the event's first subscriber, in which
    /// case the engine source has just been enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionClosed`] if the connection is
    /// already closed.
    pub fn add_listener(
        &self,
        event: EventId,
        connection: &Arc<dyn Connection>,
    ) -> Result<bool, ProtocolError> {
        if connection.is_closed() {
            return Err(ProtocolError::ConnectionClosed(connection.id().clone()));
        }

        let _guard = self.membership.lock();
        let was_first = self
            .registry
            .subscribe(event, SubscriberHandle::new(connection));
        if was_first {
            self.sources.enable_event_source(event);
            debug!(event = %event, "Event source enabled");
        }
        let stale = self.registry.remove_vanished(connection.id());
        self.disable_sources(&stale);
        info!(event = %event, connection = %connection.id(), "Listener added");
        Ok(was_first)
    }

    /// Unsubscribe a connection from an event.
    ///
    /// Returns `true` if this was the event's last subscriber, in which
    /// case the engine source has just been disabled. Unknown connections
    /// are ignored.
    pub fn remove_listener(&self, event: EventId, connection_id: &str) -> bool {
        let _guard = self.membership.lock();
        let was_last = self.registry.unsubscribe(event, connection_id);
        if was_last {
            self.sources.disable_event_source(event);
            debug!(event = %event, "Event source disabled");
        }
        was_last
    }

    /// Remove a connection from every event without announcing it.
    ///
    /// Returns the events that lost their last listener.
    pub fn remove_connection(&self, connection_id: &str) -> Vec<EventId> {
        let _guard = self.membership.lock();
        let emptied = self.registry.remove_connection(connection_id);
        self.disable_sources(&emptied);
        emptied
    }

    fn disable_sources(&self, emptied: &[EventId]) {
        for event in emptied {
            self.sources.disable_event_source(*event);
            debug!(event = %event, "Event source disabled");
        }
    }

    /// Remove a connection from every event and tell the remaining
    /// `after_connection_lost` listeners.
    ///
    /// Returns `false` if the connection had no subscriptions.
    pub async fn connection_lost(&self, connection_id: &str) -> bool {
        if self.registry.events_for(connection_id).is_empty() {
            return false;
        }
        self.drop_connection(connection_id);
        self.announce_lost(&[connection_id.to_string()]).await;
        true
    }

    /// Remove every subscription, disabling every enabled source.
    ///
    /// Returns the number of events that had listeners.
    pub fn remove_all(&self) -> usize {
        let _guard = self.membership.lock();
        let events = self.registry.clear();
        for event in &events {
            self.sources.disable_event_source(*event);
        }
        events.len()
    }

    /// Whether anybody listens for `event`.
    pub fn has_listeners(&self, event: EventId) -> bool {
        self.registry.subscriber_count(event) > 0
    }

    /// Number of listeners of `event`.
    pub fn listener_count(&self, event: EventId) -> usize {
        self.registry.subscriber_count(event)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Deliver `message` to the listeners of `event`.
    ///
    /// Returns once every subscriber in scope has been contacted. With no
    /// listeners this is a no-op.
    pub async fn dispatch(
        &self,
        event: EventId,
        message: &EventMessage,
        mode: DispatchMode,
    ) -> Dispatched {
        let subscribers = self.registry.snapshot(event);
        if subscribers.is_empty() {
            self.metrics.record_skipped();
            return Dispatched::default();
        }
        self.metrics.record_notification();

        let report = self.notifier.notify(&subscribers, message, mode).await;
        for _ in 0..report.delivered {
            self.metrics.record_delivery(event);
        }

        // Broadcast drops failing subscribers; first-response only reaps
        // connections that no longer exist.
        let dropped: Vec<ConnectionId> = match mode {
            DispatchMode::Broadcast => report.lost().cloned().collect(),
            DispatchMode::FirstResponse => {
                for (id, error) in &report.failed {
                    warn!(
                        event = %event,
                        connection = %id,
                        error = %error,
                        "Skipping failed responder"
                    );
                }
                report.gone.clone()
            }
        };

        self.drop_lost(&report, mode);
        if !dropped.is_empty() && event != EventId::System(SystemEvent::AfterConnectionLost) {
            self.announce_lost(&dropped).await;
        }

        Dispatched {
            delivered: report.delivered,
            dropped,
            response: report.response.map(|(_, value)| value),
        }
    }

    /// Broadcast shorthand.
    pub async fn broadcast(&self, event: EventId, message: &EventMessage) -> Dispatched {
        self.dispatch(event, message, DispatchMode::Broadcast).await
    }

    fn drop_connection(&self, connection_id: &str) {
        warn!(connection = %connection_id, "Dropping lost connection from all events");
        self.metrics.record_dropped(1);
        self.remove_connection(connection_id);
    }

    /// Failed subscribers are dropped by ID. Vanished ones only lose the
    /// handles that are actually gone.
    fn drop_lost(&self, report: &NotifyReport, mode: DispatchMode) {
        for id in &report.gone {
            warn!(connection = %id, "Reaping vanished connection from all events");
            self.metrics.record_dropped(1);
            let _guard = self.membership.lock();
            let emptied = self.registry.remove_vanished(id);
            self.disable_sources(&emptied);
        }
        if mode == DispatchMode::Broadcast {
            for (id, _) in &report.failed {
                self.drop_connection(id);
            }
        }
    }

    /// Announce lost connections. Listeners failing here are removed
    /// without a further announcement.
    async fn announce_lost(&self, lost: &[ConnectionId]) {
        let event = EventId::System(SystemEvent::AfterConnectionLost);
        for connection_id in lost {
            let subscribers = self.registry.snapshot(event);
            if subscribers.is_empty() {
                continue;
            }
            self.metrics.record_notification();

            let message = EventMessage::new(event).with_param(params::CONNECTION, connection_id);
            let report = self
                .notifier
                .notify(&subscribers, &message, DispatchMode::Broadcast)
                .await;
            for _ in 0..report.delivered {
                self.metrics.record_delivery(event);
            }
            self.drop_lost(&report, DispatchMode::Broadcast);
        }
    }

    // ========================================================================
    // Typed adapters
    // ========================================================================

    /// Run and phase events.
    pub fn run(&self) -> RunEvents<'_> {
        RunEvents::new(self)
    }

    /// Production lifecycle events.
    pub fn production(&self) -> ProductionEvents<'_> {
        ProductionEvents::new(self)
    }

    /// Bulk working-memory update events.
    pub fn update(&self) -> UpdateEvents<'_> {
        UpdateEvents::new(self)
    }

    /// Generic string events.
    pub fn string(&self) -> StringEvents<'_> {
        StringEvents::new(self)
    }

    /// Agent lifecycle events.
    pub fn agent(&self) -> AgentEvents<'_> {
        AgentEvents::new(self)
    }

    /// Kernel lifecycle events.
    pub fn system(&self) -> SystemEvents<'_> {
        SystemEvents::new(self)
    }

    /// Right-hand-side call/response events.
    pub fn rhs(&self) -> RhsEvents<'_> {
        RhsEvents::new(self)
    }
}
