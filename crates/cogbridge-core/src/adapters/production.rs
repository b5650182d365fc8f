//! Production lifecycle events.

use cogbridge_protocols::{params, EventCategory, ProductionEvent};

use super::broadcast_with;
use crate::hub::EventHub;

/// Adapter for [`ProductionEvent`]s. Messages carry the agent and the
/// production name.
pub struct ProductionEvents<'a> {
    hub: &'a EventHub,
}

impl<'a> ProductionEvents<'a> {
    pub(crate) fn new(hub: &'a EventHub) -> Self {
        Self { hub }
    }

    family_membership!(ProductionEvent, EventCategory::Production);

    pub async fn fire(&self, event: ProductionEvent, agent: &str, production: &str) -> usize {
        broadcast_with(self.hub, event.into(), |msg| {
            msg.with_param(params::AGENT, agent)
                .with_param(params::PRODUCTION, production)
        })
        .await
    }
}
