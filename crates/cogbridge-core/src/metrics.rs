//! Event hub metrics.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use cogbridge_protocols::EventId;

/// Counters maintained by the event hub.
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Notifications with at least one subscriber in scope.
    pub notifications: AtomicU64,

    /// Notifications skipped because nobody listens.
    pub notifications_skipped: AtomicU64,

    /// `Connection::send` calls made.
    pub transport_calls: AtomicU64,

    /// `Connection::send` calls that failed or timed out.
    pub transport_failures: AtomicU64,

    /// Connections removed after failing or disappearing.
    pub subscribers_dropped: AtomicU64,

    /// RHS invocations.
    pub rhs_calls: AtomicU64,

    /// RHS invocations that produced a value.
    pub rhs_answered: AtomicU64,

    /// Successful deliveries per event.
    deliveries: DashMap<EventId, u64>,
}

impl HubMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.notifications_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_call(&self) {
        self.transport_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.subscribers_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_rhs_call(&self, answered: bool) {
        self.rhs_calls.fetch_add(1, Ordering::Relaxed);
        if answered {
            self.rhs_answered.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful delivery of `event`.
    pub fn record_delivery(&self, event: EventId) {
        *self.deliveries.entry(event).or_insert(0) += 1;
    }

    /// Successful deliveries of one event so far.
    pub fn deliveries(&self, event: EventId) -> u64 {
        self.deliveries.get(&event).map(|v| *v).unwrap_or(0)
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            notifications: self.notifications.load(Ordering::Relaxed),
            notifications_skipped: self.notifications_skipped.load(Ordering::Relaxed),
            transport_calls: self.transport_calls.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
            rhs_calls: self.rhs_calls.load(Ordering::Relaxed),
            rhs_answered: self.rhs_answered.load(Ordering::Relaxed),
            deliveries: self
                .deliveries
                .iter()
                .map(|entry| (entry.key().as_str().to_string(), *entry.value()))
                .collect(),
        }
    }
}

/// Snapshot of hub metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct HubMetricsSnapshot {
    pub notifications: u64,
    pub notifications_skipped: u64,
    pub transport_calls: u64,
    pub transport_failures: u64,
    pub subscribers_dropped: u64,
    pub rhs_calls: u64,
    pub rhs_answered: u64,
    pub deliveries: BTreeMap<String, u64>,
}
