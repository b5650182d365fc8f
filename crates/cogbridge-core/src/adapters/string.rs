//! Generic string events.

use cogbridge_protocols::{params, EventCategory, StringEvent};

use super::broadcast_with;
use crate::hub::EventHub;

pub struct StringEvents<'a> {
    hub: &'a EventHub,
}

impl<'a> StringEvents<'a> {
    pub(crate) fn new(hub: &'a EventHub) -> Self {
        Self { hub }
    }

    family_membership!(StringEvent, EventCategory::String);

    pub async fn fire(&self, event: StringEvent, value: &str) -> usize {
        broadcast_with(self.hub, event.into(), |msg| {
            msg.with_param(params::VALUE, value)
        })
        .await
    }
}
