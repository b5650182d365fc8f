//! Typed event adapters.
//!
//! One adapter per event family. An adapter is a borrowed view over the
//! [`EventHub`]: it only accepts ids of its own family, turns a typed
//! occurrence into an [`EventMessage`] and broadcasts it.
//!
//! ```ignore
//! hub.run().add(RunEvent::AfterPhaseExecuted, &conn)?;
//! hub.run().fire_phase(RunEvent::AfterPhaseExecuted, "soar1", Phase::Apply).await;
//! ```

/// Membership methods shared by every adapter. Defined ahead of the
/// adapter modules so they see it in textual scope.
macro_rules! family_membership {
    ($family:ty, $category:expr) => {
        /// Subscribe a connection; `true` if it is the first listener.
        pub fn add(
            &self,
            event: $family,
            connection: &std::sync::Arc<dyn cogbridge_protocols::Connection>,
        ) -> Result<bool, cogbridge_protocols::ProtocolError> {
            self.hub.add_listener(event.into(), connection)
        }

        /// Unsubscribe a connection; `true` if it was the last listener.
        pub fn remove(&self, event: $family, connection_id: &str) -> bool {
            self.hub.remove_listener(event.into(), connection_id)
        }

        /// Whether anybody listens for `event`.
        pub fn has_listeners(&self, event: $family) -> bool {
            self.hub.has_listeners(event.into())
        }

        /// Parse a wire name that must belong to this family.
        pub fn parse(name: &str) -> Result<$family, cogbridge_protocols::ProtocolError> {
            crate::adapters::parse_member(name, <$family>::ALL, $category)
        }
    };
}
pub(crate) use family_membership;

mod agent;
mod production;
mod run;
mod string;
mod system;
mod update;

pub use agent::AgentEvents;
pub use production::ProductionEvents;
pub use run::RunEvents;
pub use string::StringEvents;
pub use system::SystemEvents;
pub use update::UpdateEvents;

use cogbridge_protocols::{EventCategory, EventId, EventMessage, ProtocolError};

use crate::hub::EventHub;

/// Look up `name` among `members`, telling apart names that belong to
/// another family from names that do not exist at all.
pub(crate) fn parse_member<T: Copy + Into<EventId>>(
    name: &str,
    members: &[T],
    expected: EventCategory,
) -> Result<T, ProtocolError> {
    let found = members
        .iter()
        .copied()
        .find(|m| Into::<EventId>::into(*m).as_str() == name);
    if let Some(member) = found {
        return Ok(member);
    }
    let id: EventId = name.parse()?;
    Err(ProtocolError::WrongFamily {
        event: id.as_str().to_string(),
        expected,
    })
}

/// Broadcast a message built only when somebody listens.
pub(crate) async fn broadcast_with(
    hub: &EventHub,
    event: EventId,
    build: impl FnOnce(EventMessage) -> EventMessage,
) -> usize {
    if !hub.has_listeners(event) {
        hub.metrics().record_skipped();
        return 0;
    }
    let message = build(EventMessage::new(event));
    hub.broadcast(event, &message).await.delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogbridge_protocols::{RunEvent, UpdateEvent};

    #[test]
    fn test_parse_member() {
        let event = parse_member("after_run_ends", RunEvent::ALL, EventCategory::Run).unwrap();
        assert_eq!(event, RunEvent::AfterRunEnds);
    }

    #[test]
    fn test_parse_member_wrong_family() {
        let err = parse_member("after_all_output_phases", RunEvent::ALL, EventCategory::Run)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::WrongFamily { ref event, expected: EventCategory::Run }
                if event == "after_all_output_phases"
        ));
    }

    #[test]
    fn test_parse_member_unknown() {
        let err = parse_member("nope", UpdateEvent::ALL, EventCategory::Update).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownEvent(_)));
    }
}
