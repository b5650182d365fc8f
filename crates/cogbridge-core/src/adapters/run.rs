//! Run and phase boundary events.

use cogbridge_protocols::{params, EventCategory, Phase, RunEvent};

use super::broadcast_with;
use crate::hub::EventHub;

/// Adapter for [`RunEvent`]s. Messages carry the agent and, at phase
/// boundaries, the phase.
pub struct RunEvents<'a> {
    hub: &'a EventHub,
}

impl<'a> RunEvents<'a> {
    pub(crate) fn new(hub: &'a EventHub) -> Self {
        Self { hub }
    }

    family_membership!(RunEvent, EventCategory::Run);

    /// Broadcast a run event for `agent`.
    pub async fn fire(&self, event: RunEvent, agent: &str) -> usize {
        broadcast_with(self.hub, event.into(), |msg| {
            msg.with_param(params::AGENT, agent)
        })
        .await
    }

    /// Broadcast a run event for `agent` at `phase`.
    pub async fn fire_phase(&self, event: RunEvent, agent: &str, phase: Phase) -> usize {
        broadcast_with(self.hub, event.into(), |msg| {
            msg.with_param(params::AGENT, agent)
                .with_param(params::PHASE, phase.as_str())
        })
        .await
    }
}
