//! Bulk working-memory update events.

use cogbridge_protocols::{params, EventCategory, UpdateEvent};

use super::broadcast_with;
use crate::hub::EventHub;

/// Adapter for [`UpdateEvent`]s. These are reported once for all agents,
/// so messages carry a single value instead of an agent name.
pub struct UpdateEvents<'a> {
    hub: &'a EventHub,
}

impl<'a> UpdateEvents<'a> {
    pub(crate) fn new(hub: &'a EventHub) -> Self {
        Self { hub }
    }

    family_membership!(UpdateEvent, EventCategory::Update);

    pub async fn fire(&self, event: UpdateEvent, value: &str) -> usize {
        broadcast_with(self.hub, event.into(), |msg| {
            msg.with_param(params::VALUE, value)
        })
        .await
    }
}
