//! Kernel lifecycle events.

use cogbridge_protocols::{params, EventCategory, SystemEvent};

use super::broadcast_with;
use crate::hub::EventHub;

/// Adapter for [`SystemEvent`]s.
///
/// `after_connection_lost` is raised by the hub itself when it drops a
/// subscriber; use [`EventHub::connection_lost`] rather than firing it here.
pub struct SystemEvents<'a> {
    hub: &'a EventHub,
}

impl<'a> SystemEvents<'a> {
    pub(crate) fn new(hub: &'a EventHub) -> Self {
        Self { hub }
    }

    family_membership!(SystemEvent, EventCategory::System);

    /// Broadcast a parameterless system event.
    pub async fn fire(&self, event: SystemEvent) -> usize {
        broadcast_with(self.hub, event.into(), |msg| msg).await
    }

    /// Give clients a chance to request an interrupt. `steps` is the number
    /// of engine steps taken so far in the current run.
    pub async fn interrupt_check(&self, steps: u64) -> usize {
        broadcast_with(self.hub, SystemEvent::InterruptCheck.into(), |msg| {
            msg.with_param(params::COUNT, steps.to_string())
        })
        .await
    }
}
