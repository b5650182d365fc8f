//! Right-hand-side callback protocol.
//!
//! A rule's right-hand side may call a function implemented by a client.
//! The call is a first-response notification: listeners are asked in
//! subscription order and the first one answering with a non-empty value
//! supplies the result. Nobody answering is a normal outcome ("no value"),
//! not an error.

use tracing::{debug, warn};

use cogbridge_protocols::{params, EventCategory, EventId, EventMessage, RhsEvent};

use crate::adapters::family_membership;
use crate::hub::EventHub;
use crate::notifier::DispatchMode;

#[cfg(test)]
#[path = "rhs_tests.rs"]
mod tests;

/// One RHS invocation: what to call and where to put the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhsCallContext {
    pub function_name: String,
    pub argument: String,
    /// Capacity of the result slot, in bytes.
    pub max_result_len: usize,
    result: Option<String>,
    truncated: bool,
}

impl RhsCallContext {
    pub fn new(
        function_name: impl Into<String>,
        argument: impl Into<String>,
        max_result_len: usize,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            argument: argument.into(),
            max_result_len,
            result: None,
            truncated: false,
        }
    }

    /// Value supplied by the last invocation, if any.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Take the value out of the slot.
    pub fn take_result(&mut self) -> Option<String> {
        self.result.take()
    }

    /// Whether the last value had to be cut to fit.
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    fn reset(&mut self) {
        self.result = None;
        self.truncated = false;
    }
}

/// Adapter for [`RhsEvent`]s.
pub struct RhsEvents<'a> {
    hub: &'a EventHub,
}

impl<'a> RhsEvents<'a> {
    pub(crate) fn new(hub: &'a EventHub) -> Self {
        Self { hub }
    }

    family_membership!(RhsEvent, EventCategory::Rhs);

    /// Call a user-defined RHS function.
    ///
    /// Returns `true` and fills the context's result slot if some listener
    /// answered; `false` otherwise.
    pub async fn invoke(&self, ctx: &mut RhsCallContext) -> bool {
        self.call(RhsEvent::RhsUserFunction, ctx).await
    }

    /// Send a free-form client message and collect the first answer.
    pub async fn client_message(&self, ctx: &mut RhsCallContext) -> bool {
        self.call(RhsEvent::ClientMessage, ctx).await
    }

    async fn call(&self, event: RhsEvent, ctx: &mut RhsCallContext) -> bool {
        ctx.reset();
        let id: EventId = event.into();

        if !self.hub.has_listeners(id) {
            debug!(function = %ctx.function_name, "No RHS listener, no value");
            self.hub.metrics().record_skipped();
            self.hub.metrics().record_rhs_call(false);
            return false;
        }

        let message = EventMessage::new(id)
            .with_param(params::FUNCTION, &ctx.function_name)
            .with_param(params::ARGUMENT, &ctx.argument);
        let dispatched = self
            .hub
            .dispatch(id, &message, DispatchMode::FirstResponse)
            .await;

        let capacity = ctx.max_result_len.min(self.hub.config().max_rhs_result_len);
        let answered = match dispatched.response {
            Some(value) => {
                let (value, truncated) = truncate_to(value, capacity);
                if truncated {
                    warn!(
                        function = %ctx.function_name,
                        capacity,
                        "RHS result truncated"
                    );
                }
                ctx.truncated = truncated;
                if value.is_empty() {
                    false
                } else {
                    ctx.result = Some(value);
                    true
                }
            }
            None => false,
        };

        self.hub.metrics().record_rhs_call(answered);
        debug!(function = %ctx.function_name, answered, "RHS call finished");
        answered
    }
}

/// Cut `value` to at most `max_len` bytes on a char boundary.
fn truncate_to(mut value: String, max_len: usize) -> (String, bool) {
    if value.len() <= max_len {
        return (value, false);
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
    (value, true)
}
