//! Outbound event message.
//!
//! A message is the event's wire name plus an ordered list of string
//! parameters. It is built fresh for every notification and dropped once
//! every subscriber in scope has been contacted.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::event::EventId;

/// Well-known parameter names.
pub mod params {
    pub const AGENT: &str = "agent";
    pub const PHASE: &str = "phase";
    pub const PRODUCTION: &str = "production";
    pub const VALUE: &str = "value";
    pub const CONNECTION: &str = "connection";
    pub const FUNCTION: &str = "function";
    pub const ARGUMENT: &str = "argument";
    pub const COUNT: &str = "count";
    pub const REASON: &str = "reason";
}

/// Event message sent to every subscriber of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Event wire name.
    pub event: String,
    /// Parameters in insertion order.
    #[serde(default)]
    pub params: Vec<(String, String)>,
}

impl EventMessage {
    /// Create a message with no parameters.
    pub fn new(event: EventId) -> Self {
        Self {
            event: event.as_str().to_string(),
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_param(name, value);
        self
    }

    /// Append a parameter in place.
    pub fn push_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push((name.into(), value.into()));
    }

    /// First value recorded for `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parse the event name back into an [`EventId`].
    pub fn event_id(&self) -> Result<EventId, ProtocolError> {
        self.event.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{RunEvent, SystemEvent};

    #[test]
    fn test_message_params_keep_order() {
        let msg = EventMessage::new(RunEvent::BeforePhaseExecuted.into())
            .with_param(params::AGENT, "soar1")
            .with_param(params::PHASE, "apply");

        assert_eq!(msg.event, "before_phase_executed");
        assert_eq!(msg.params[0].0, "agent");
        assert_eq!(msg.params[1].0, "phase");
        assert_eq!(msg.param(params::PHASE), Some("apply"));
        assert_eq!(msg.param(params::PRODUCTION), None);
    }

    #[test]
    fn test_message_event_id() {
        let msg = EventMessage::new(SystemEvent::InterruptCheck.into());
        assert_eq!(
            msg.event_id().unwrap(),
            EventId::System(SystemEvent::InterruptCheck)
        );

        let bogus = EventMessage {
            event: "mystery".to_string(),
            params: Vec::new(),
        };
        assert!(bogus.event_id().is_err());
    }

    #[test]
    fn test_message_json() {
        let msg = EventMessage::new(SystemEvent::AfterConnectionLost.into())
            .with_param(params::CONNECTION, "conn-1");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("after_connection_lost"));
        assert!(json.contains("conn-1"));

        let parsed: EventMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_message_missing_params_defaults() {
        let parsed: EventMessage = serde_json::from_str(r#"{"event":"print"}"#).unwrap();
        assert!(parsed.params.is_empty());
    }
}
