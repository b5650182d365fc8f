//! Agent lifecycle events.

use cogbridge_protocols::{params, AgentEvent, EventCategory};

use super::broadcast_with;
use crate::hub::EventHub;

pub struct AgentEvents<'a> {
    hub: &'a EventHub,
}

impl<'a> AgentEvents<'a> {
    pub(crate) fn new(hub: &'a EventHub) -> Self {
        Self { hub }
    }

    family_membership!(AgentEvent, EventCategory::Agent);

    pub async fn fire(&self, event: AgentEvent, agent: &str) -> usize {
        broadcast_with(self.hub, event.into(), |msg| {
            msg.with_param(params::AGENT, agent)
        })
        .await
    }
}
