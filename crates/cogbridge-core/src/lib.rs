//! # cogbridge Core
//!
//! Event subscription and notification layer of the cogbridge kernel.
//!
//! ## Components
//!
//! - [`SubscriptionRegistry`] - Per-event ordered lists of weak subscriber handles
//! - [`Notifier`] - Walks a subscriber snapshot in broadcast or first-response mode
//! - [`EventHub`] - Explicit kernel context: registry, notifier, engine source hooks
//! - Typed adapters ([`RunEvents`], [`ProductionEvents`], [`UpdateEvents`], ...)
//! - [`RhsEvents`] - Call/response protocol for rule right-hand-side functions
//!
//! Every notification is awaited in full: control returns to the engine
//! only once every subscriber in scope has been contacted.

pub mod adapters;
pub mod config;
pub mod hub;
pub mod metrics;
pub mod notifier;
pub mod registry;
pub mod rhs;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapters::{
    AgentEvents, ProductionEvents, RunEvents, StringEvents, SystemEvents, UpdateEvents,
};
pub use config::HubConfig;
pub use hub::{Dispatched, EventHub};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
pub use notifier::{DispatchMode, Notifier, NotifyReport};
pub use registry::{SubscriberHandle, SubscriptionRegistry};
pub use rhs::{RhsCallContext, RhsEvents};
