use super::*;
use crate::testing::RecordingConnection;
use cogbridge_protocols::{ProductionEvent, RunEvent};

fn conn(id: &str) -> Arc<dyn Connection> {
    Arc::new(RecordingConnection::new(id))
}

fn phase_event() -> EventId {
    RunEvent::AfterPhaseExecuted.into()
}

#[test]
fn test_registry_new_is_empty() {
    let registry = SubscriptionRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    assert!(registry.snapshot(phase_event()).is_empty());
}

#[test]
fn test_subscribe_reports_first() {
    let registry = SubscriptionRegistry::new();
    let a = conn("a");
    let b = conn("b");

    assert!(registry.subscribe(phase_event(), SubscriberHandle::new(&a)));
    assert!(!registry.subscribe(phase_event(), SubscriberHandle::new(&b)));
    assert_eq!(registry.subscriber_count(phase_event()), 2);
}

#[test]
fn test_duplicate_subscribe_is_noop() {
    let registry = SubscriptionRegistry::new();
    let a = conn("a");

    assert!(registry.subscribe(phase_event(), SubscriberHandle::new(&a)));
    assert!(!registry.subscribe(phase_event(), SubscriberHandle::new(&a)));
    assert_eq!(registry.subscriber_count(phase_event()), 1);
}

#[test]
fn test_unsubscribe_reports_last() {
    let registry = SubscriptionRegistry::new();
    let a = conn("a");
    let b = conn("b");
    registry.subscribe(phase_event(), SubscriberHandle::new(&a));
    registry.subscribe(phase_event(), SubscriberHandle::new(&b));

    assert!(!registry.unsubscribe(phase_event(), "a"));
    assert!(registry.unsubscribe(phase_event(), "b"));
    assert!(registry.is_empty());
}

#[test]
fn test_unsubscribe_absent_is_noop() {
    let registry = SubscriptionRegistry::new();
    let a = conn("a");
    registry.subscribe(phase_event(), SubscriberHandle::new(&a));

    assert!(!registry.unsubscribe(phase_event(), "ghost"));
    assert!(!registry.unsubscribe(ProductionEvent::AfterProductionFired.into(), "a"));
    assert_eq!(registry.subscriber_count(phase_event()), 1);
}

#[test]
fn test_snapshot_preserves_subscription_order() {
    let registry = SubscriptionRegistry::new();
    let conns: Vec<_> = ["c", "a", "b"].iter().map(|id| conn(id)).collect();
    for c in &conns {
        registry.subscribe(phase_event(), SubscriberHandle::new(c));
    }

    let ids: Vec<_> = registry
        .snapshot(phase_event())
        .iter()
        .map(|h| h.id().clone())
        .collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn test_snapshot_is_detached() {
    let registry = SubscriptionRegistry::new();
    let a = conn("a");
    registry.subscribe(phase_event(), SubscriberHandle::new(&a));

    let snapshot = registry.snapshot(phase_event());
    registry.unsubscribe(phase_event(), "a");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(registry.subscriber_count(phase_event()), 0);
}

#[test]
fn test_remove_connection_reports_emptied_events() {
    let registry = SubscriptionRegistry::new();
    let a = conn("a");
    let b = conn("b");
    let fired: EventId = ProductionEvent::AfterProductionFired.into();

    registry.subscribe(phase_event(), SubscriberHandle::new(&a));
    registry.subscribe(phase_event(), SubscriberHandle::new(&b));
    registry.subscribe(fired, SubscriberHandle::new(&a));

    let emptied = registry.remove_connection("a");
    assert_eq!(emptied, vec![fired]);
    assert!(!registry.contains(phase_event(), "a"));
    assert!(registry.contains(phase_event(), "b"));
    assert!(registry.events_for("a").is_empty());
}

#[test]
fn test_handle_is_weak() {
    let registry = SubscriptionRegistry::new();
    let a = conn("a");
    registry.subscribe(phase_event(), SubscriberHandle::new(&a));
    drop(a);

    let snapshot = registry.snapshot(phase_event());
    assert_eq!(snapshot.len(), 1);
    assert!(!snapshot[0].is_alive());
    assert!(snapshot[0].upgrade().is_none());
}

#[test]
fn test_clear_returns_subscribed_events() {
    let registry = SubscriptionRegistry::new();
    let a = conn("a");
    registry.subscribe(phase_event(), SubscriberHandle::new(&a));
    registry.subscribe(RunEvent::AfterRunEnds.into(), SubscriberHandle::new(&a));

    let mut cleared = registry.clear();
    cleared.sort_by_key(|e| e.as_str());
    assert_eq!(cleared.len(), 2);
    assert!(registry.is_empty());
}

#[test]
fn test_resubscribe_replaces_vanished_handle() {
    let registry = SubscriptionRegistry::new();
    let old = conn("client");
    registry.subscribe(phase_event(), SubscriberHandle::new(&old));
    drop(old);

    let new = conn("client");
    assert!(registry.subscribe(phase_event(), SubscriberHandle::new(&new)));
    let snapshot = registry.snapshot(phase_event());
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].is_alive());
}

#[test]
fn test_remove_vanished_keeps_live_handle() {
    let registry = SubscriptionRegistry::new();
    let fired: EventId = ProductionEvent::AfterProductionFired.into();
    let old = conn("client");
    registry.subscribe(phase_event(), SubscriberHandle::new(&old));
    registry.subscribe(fired, SubscriberHandle::new(&old));
    drop(old);

    let new = conn("client");
    registry.subscribe(phase_event(), SubscriberHandle::new(&new));
    let emptied = registry.remove_vanished("client");
    assert_eq!(emptied, vec![fired]);
    assert!(registry.contains(phase_event(), "client"));
    assert_eq!(registry.len(), 1);
}
