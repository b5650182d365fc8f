//! Kernel session.
//!
//! Client-facing entry point: owns the hub and the scheduler for one
//! kernel and exposes subscription management, runs, interrupts and the
//! kernel lifecycle notifications.

use std::sync::Arc;

use tracing::info;

use cogbridge_core::{EventHub, HubMetricsSnapshot, RhsCallContext};
use cogbridge_protocols::{Connection, Engine, EventId, ProtocolError, RhsEvent, SystemEvent};

use crate::config::SchedulerConfig;
use crate::interrupt::InterruptHandle;
use crate::metrics::SchedulerMetricsSnapshot;
use crate::outcome::{RunOutcome, RunReport};
use crate::request::RunRequest;
use crate::scheduler::RunScheduler;

/// Counters from both halves of the kernel.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionMetrics {
    pub hub: HubMetricsSnapshot,
    pub scheduler: SchedulerMetricsSnapshot,
}

/// One kernel: event hub plus run scheduler.
pub struct KernelSession {
    hub: Arc<EventHub>,
    scheduler: RunScheduler,
}

impl KernelSession {
    pub fn new(hub: Arc<EventHub>, engine: Arc<dyn Engine>, config: SchedulerConfig) -> Self {
        let scheduler = RunScheduler::new(engine, hub.clone(), config);
        Self { hub, scheduler }
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    pub fn scheduler(&self) -> &RunScheduler {
        &self.scheduler
    }

    /// Announce that the kernel is up.
    pub async fn start(&self) {
        info!("Kernel session started");
        self.hub.system().fire(SystemEvent::SystemStart).await;
    }

    /// Announce shutdown, then drop every subscription.
    ///
    /// Returns the number of events that still had listeners.
    pub async fn shutdown(&self) -> usize {
        self.scheduler.request_interrupt();
        self.hub.system().fire(SystemEvent::BeforeShutdown).await;
        self.hub.system().fire(SystemEvent::SystemStop).await;
        let removed = self.hub.remove_all();
        info!(removed, "Kernel session shut down");
        removed
    }

    /// Register `connection` for `event`; `true` if it is the first listener.
    pub fn subscribe(
        &self,
        event: EventId,
        connection: &Arc<dyn Connection>,
    ) -> Result<bool, ProtocolError> {
        self.hub.add_listener(event, connection)
    }

    /// Remove `connection_id` from `event`; `true` if it was the last listener.
    pub fn unsubscribe(&self, event: EventId, connection_id: &str) -> bool {
        self.hub.remove_listener(event, connection_id)
    }

    /// [`subscribe`](Self::subscribe) by wire name.
    pub fn subscribe_by_name(
        &self,
        name: &str,
        connection: &Arc<dyn Connection>,
    ) -> Result<bool, ProtocolError> {
        let event: EventId = name.parse()?;
        self.subscribe(event, connection)
    }

    /// [`unsubscribe`](Self::unsubscribe) by wire name.
    pub fn unsubscribe_by_name(
        &self,
        name: &str,
        connection_id: &str,
    ) -> Result<bool, ProtocolError> {
        let event: EventId = name.parse()?;
        Ok(self.unsubscribe(event, connection_id))
    }

    /// A client went away: drop all its subscriptions and tell the others.
    pub async fn disconnect(&self, connection_id: &str) -> bool {
        self.hub.connection_lost(connection_id).await
    }

    pub async fn schedule_run(&self, request: RunRequest) -> RunOutcome {
        self.scheduler.schedule_run(request).await
    }

    pub async fn run_with_report(&self, request: RunRequest) -> RunReport {
        self.scheduler.run_with_report(request).await
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.scheduler.interrupt_handle()
    }

    pub fn request_interrupt(&self) {
        self.scheduler.request_interrupt();
    }

    /// Call a client-implemented RHS function.
    ///
    /// `None` when no listener answered.
    pub async fn invoke_rhs(&self, function: &str, argument: &str) -> Option<String> {
        let capacity = self.hub.config().max_rhs_result_len;
        let mut ctx = RhsCallContext::new(function, argument, capacity);
        if self.hub.rhs().invoke(&mut ctx).await {
            ctx.take_result()
        } else {
            None
        }
    }

    /// Send a free-form message to whichever client answers first.
    pub async fn client_message(&self, topic: &str, message: &str) -> Option<String> {
        let capacity = self.hub.config().max_rhs_result_len;
        let mut ctx = RhsCallContext::new(topic, message, capacity);
        if self.hub.rhs().client_message(&mut ctx).await {
            ctx.take_result()
        } else {
            None
        }
    }

    /// Whether anybody answers RHS user functions.
    pub fn has_rhs_handler(&self) -> bool {
        self.hub.rhs().has_listeners(RhsEvent::RhsUserFunction)
    }

    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics {
            hub: self.hub.metrics().snapshot(),
            scheduler: self.scheduler.metrics().snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CycleEngine, EventSources, SimAgentSpec};
    use cogbridge_core::testing::RecordingConnection;
    use cogbridge_core::HubConfig;
    use cogbridge_protocols::params;

    async fn session() -> (KernelSession, Arc<EventSources>) {
        let sources = Arc::new(EventSources::new());
        let hub = Arc::new(EventHub::new(sources.clone(), HubConfig::default()));
        let engine = Arc::new(CycleEngine::new(hub.clone(), sources.clone()));
        engine.create_agent(SimAgentSpec::new("soar1")).await.unwrap();
        (
            KernelSession::new(hub, engine, SchedulerConfig::default()),
            sources,
        )
    }

    #[tokio::test]
    async fn test_subscribe_by_name_toggles_source() {
        let (session, sources) = session().await;
        let client = Arc::new(RecordingConnection::new("client"));

        assert!(session
            .subscribe_by_name("after_phase_executed", &client.as_connection())
            .unwrap());
        let event = EventId::from(cogbridge_protocols::RunEvent::AfterPhaseExecuted);
        assert!(sources.is_enabled(event));

        assert!(session
            .unsubscribe_by_name("after_phase_executed", "client")
            .unwrap());
        assert!(sources.enabled().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_unknown_name() {
        let (session, _) = session().await;
        let client = Arc::new(RecordingConnection::new("client"));
        let err = session
            .subscribe_by_name("after_lunch", &client.as_connection())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownEvent(_)));
    }

    #[tokio::test]
    async fn test_lifecycle_notifications() {
        let (session, _) = session().await;
        let client = Arc::new(RecordingConnection::new("client"));
        for event in SystemEvent::ALL {
            if *event != SystemEvent::InterruptCheck {
                session.subscribe((*event).into(), &client.as_connection()).unwrap();
            }
        }

        session.start().await;
        let removed = session.shutdown().await;

        assert_eq!(
            client.event_names(),
            vec!["system_start", "before_shutdown", "system_stop"]
        );
        assert_eq!(removed, 4);
        assert!(session.hub().registry().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_rhs() {
        let (session, _) = session().await;
        assert_eq!(session.invoke_rhs("lookup", "x").await, None);

        let responder = Arc::new(RecordingConnection::new("rhs").answering("found"));
        session
            .subscribe(RhsEvent::RhsUserFunction.into(), &responder.as_connection())
            .unwrap();
        assert!(session.has_rhs_handler());
        assert_eq!(session.invoke_rhs("lookup", "x").await, Some("found".to_string()));
        assert_eq!(responder.messages()[0].param(params::FUNCTION), Some("lookup"));
    }

    #[tokio::test]
    async fn test_disconnect_announces() {
        let (session, _) = session().await;
        let leaving = Arc::new(RecordingConnection::new("leaving"));
        let watcher = Arc::new(RecordingConnection::new("watcher"));
        session
            .subscribe(SystemEvent::SystemStart.into(), &leaving.as_connection())
            .unwrap();
        session
            .subscribe(SystemEvent::AfterConnectionLost.into(), &watcher.as_connection())
            .unwrap();

        assert!(session.disconnect("leaving").await);
        let lost = watcher.messages_for("after_connection_lost");
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].param(params::CONNECTION), Some("leaving"));
    }

    #[tokio::test]
    async fn test_run_updates_metrics() {
        let (session, _) = session().await;
        let outcome = session.schedule_run(RunRequest::decisions(2)).await;
        assert_eq!(outcome, RunOutcome::Completed);

        let metrics = session.metrics();
        assert_eq!(metrics.scheduler.runs_started, 1);
        assert_eq!(metrics.scheduler.runs_completed, 1);
        assert_eq!(metrics.scheduler.steps, 2);
    }
}
