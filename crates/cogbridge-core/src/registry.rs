//! Subscription registry.
//!
//! Maps every [`EventId`] to the ordered list of connections listening for
//! it. List order is subscription order and is the order in which the
//! notifier contacts subscribers.
//!
//! The registry only holds weak references: a connection that has been
//! dropped by its owner is skipped (and later reaped) rather than kept
//! alive by its subscriptions.

use std::sync::{Arc, Weak};

use dashmap::DashMap;

use cogbridge_protocols::{Connection, ConnectionId, EventId};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

/// Weak reference to a subscribed connection.
#[derive(Clone)]
pub struct SubscriberHandle {
    id: ConnectionId,
    connection: Weak<dyn Connection>,
}

impl SubscriberHandle {
    /// Create a handle without taking ownership of the connection.
    pub fn new(connection: &Arc<dyn Connection>) -> Self {
        Self {
            id: connection.id().clone(),
            connection: Arc::downgrade(connection),
        }
    }

    /// Connection ID captured at subscription time.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Upgrade to a strong reference if the connection still exists.
    pub fn upgrade(&self) -> Option<Arc<dyn Connection>> {
        self.connection.upgrade()
    }

    /// Whether the connection is still owned by someone.
    pub fn is_alive(&self) -> bool {
        self.connection.strong_count() > 0
    }

    /// Whether the connection still exists and is open.
    pub fn is_usable(&self) -> bool {
        self.connection.upgrade().is_some_and(|c| !c.is_closed())
    }
}

impl std::fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Per-event ordered subscriber lists.
///
/// An event with no subscribers has no entry at all.
pub struct SubscriptionRegistry {
    lists: DashMap<EventId, Vec<SubscriberHandle>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            lists: DashMap::new(),
        }
    }

    /// Append a subscriber to an event's list.
    ///
    /// Returns `true` if the list went from empty to one subscriber.
    /// Subscribing a connection that is already in the list is a no-op
    /// returning `false`. A vanished handle under the same ID is replaced.
    pub fn subscribe(&self, event: EventId, handle: SubscriberHandle) -> bool {
        let mut list = self.lists.entry(event).or_default();
        list.retain(|h| h.id != handle.id || h.is_usable());
        if list.iter().any(|h| h.id == handle.id) {
            return false;
        }
        list.push(handle);
        list.len() == 1
    }

    /// Remove a subscriber from an event's list.
    ///
    /// Returns `true` if the list went from one subscriber to empty.
    /// Removing a connection that is not subscribed is a no-op returning
    /// `false`.
    pub fn unsubscribe(&self, event: EventId, connection_id: &str) -> bool {
        let became_empty = match self.lists.get_mut(&event) {
            Some(mut list) => {
                let before = list.len();
                list.retain(|h| h.id != connection_id);
                before != list.len() && list.is_empty()
            }
            None => false,
        };
        if became_empty {
            self.lists.remove_if(&event, |_, list| list.is_empty());
        }
        became_empty
    }

    /// Copy of an event's subscriber list, in notification order.
    ///
    /// The copy is taken under the shard lock and released before the
    /// caller starts contacting subscribers.
    pub fn snapshot(&self, event: EventId) -> Vec<SubscriberHandle> {
        self.lists
            .get(&event)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Remove a connection from every event.
    ///
    /// Returns the events whose list became empty as a result.
    pub fn remove_connection(&self, connection_id: &str) -> Vec<EventId> {
        let mut emptied = Vec::new();
        for mut entry in self.lists.iter_mut() {
            let before = entry.len();
            entry.retain(|h| h.id != connection_id);
            if before != entry.len() && entry.is_empty() {
                emptied.push(*entry.key());
            }
        }
        for event in &emptied {
            self.lists.remove_if(event, |_, list| list.is_empty());
        }
        emptied
    }

    /// Remove the vanished handles of a connection from every event,
    /// leaving a live connection under the same ID in place.
    ///
    /// Returns the events whose list became empty as a result.
    pub fn remove_vanished(&self, connection_id: &str) -> Vec<EventId> {
        let mut emptied = Vec::new();
        for mut entry in self.lists.iter_mut() {
            let before = entry.len();
            entry.retain(|h| h.id != connection_id || h.is_usable());
            if before != entry.len() && entry.is_empty() {
                emptied.push(*entry.key());
            }
        }
        for event in &emptied {
            self.lists.remove_if(event, |_, list| list.is_empty());
        }
        emptied
    }

    /// Remove every subscription, returning the events that had any.
    pub fn clear(&self) -> Vec<EventId> {
        let events = self.subscribed_events();
        self.lists.clear();
        events
    }

    /// Whether a connection is subscribed to an event.
    pub fn contains(&self, event: EventId, connection_id: &str) -> bool {
        self.lists
            .get(&event)
            .is_some_and(|list| list.iter().any(|h| h.id == connection_id))
    }

    /// Number of subscribers of an event.
    pub fn subscriber_count(&self, event: EventId) -> usize {
        self.lists.get(&event).map(|list| list.len()).unwrap_or(0)
    }

    /// Events a connection is subscribed to.
    pub fn events_for(&self, connection_id: &str) -> Vec<EventId> {
        self.lists
            .iter()
            .filter(|entry| entry.iter().any(|h| h.id == connection_id))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Events with at least one subscriber.
    pub fn subscribed_events(&self) -> Vec<EventId> {
        self.lists.iter().map(|entry| *entry.key()).collect()
    }

    /// Total number of (event, connection) pairs.
    pub fn len(&self) -> usize {
        self.lists.iter().map(|entry| entry.len()).sum()
    }

    /// Whether no event has a subscriber.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
