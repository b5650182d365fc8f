//! Event vocabulary.
//!
//! Every occurrence the kernel can report to a listener is named by an
//! [`EventId`]. Ids are grouped into families ([`EventCategory`]); each
//! family is its own closed enum so a typed adapter can only be handed ids
//! of the family it serves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

/// Event family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Kernel lifecycle, interrupt checks and connection loss.
    System,
    /// Run and phase boundaries.
    Run,
    /// Production lifecycle (added, fired, retracted, removed).
    Production,
    /// Agent lifecycle.
    Agent,
    /// Bulk working-memory updates across all agents.
    Update,
    /// Generic string events.
    String,
    /// Right-hand-side function calls (call/response).
    Rhs,
}

impl EventCategory {
    /// All families.
    pub const ALL: [EventCategory; 7] = [
        EventCategory::System,
        EventCategory::Run,
        EventCategory::Production,
        EventCategory::Agent,
        EventCategory::Update,
        EventCategory::String,
        EventCategory::Rhs,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::System => "system",
            EventCategory::Run => "run",
            EventCategory::Production => "production",
            EventCategory::Agent => "agent",
            EventCategory::Update => "update",
            EventCategory::String => "string",
            EventCategory::Rhs => "rhs",
        }
    }

    /// Events belonging to this family, in declaration order.
    pub fn events(&self) -> Vec<EventId> {
        EventId::all().filter(|id| id.category() == *self).collect()
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! event_family {
    (
        $(#[$meta:meta])*
        $name:ident => $category:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            /// Every member of this family, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stable wire name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl From<$name> for EventId {
            fn from(event: $name) -> Self {
                EventId::$category(event)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

event_family! {
    /// Kernel lifecycle events.
    SystemEvent => System {
        /// The kernel finished starting.
        SystemStart = "system_start",
        /// The kernel stopped.
        SystemStop = "system_stop",
        /// The kernel is about to shut down.
        BeforeShutdown = "before_shutdown",
        /// A subscribed connection disappeared or failed and was dropped.
        AfterConnectionLost = "after_connection_lost",
        /// Periodic chance for clients to request an interrupt during a run.
        InterruptCheck = "interrupt_check",
    }
}

event_family! {
    /// Run and phase boundary events, reported per agent.
    RunEvent => Run {
        BeforeSmallestStep = "before_smallest_step",
        AfterSmallestStep = "after_smallest_step",
        BeforeElaborationCycle = "before_elaboration_cycle",
        AfterElaborationCycle = "after_elaboration_cycle",
        BeforePhaseExecuted = "before_phase_executed",
        AfterPhaseExecuted = "after_phase_executed",
        BeforeDecisionCycle = "before_decision_cycle",
        AfterDecisionCycle = "after_decision_cycle",
        /// The agent stopped because an interrupt was requested.
        AfterInterrupt = "after_interrupt",
        BeforeRunStarts = "before_run_starts",
        AfterRunEnds = "after_run_ends",
    }
}

event_family! {
    /// Production lifecycle events.
    ProductionEvent => Production {
        AfterProductionAdded = "after_production_added",
        BeforeProductionRemoved = "before_production_removed",
        AfterProductionFired = "after_production_fired",
        BeforeProductionRetracted = "before_production_retracted",
    }
}

event_family! {
    /// Agent lifecycle events.
    AgentEvent => Agent {
        AfterAgentCreated = "after_agent_created",
        BeforeAgentDestroyed = "before_agent_destroyed",
        BeforeAgentReinitialized = "before_agent_reinitialized",
        AfterAgentReinitialized = "after_agent_reinitialized",
    }
}

event_family! {
    /// Bulk working-memory update events, reported once for all agents.
    UpdateEvent => Update {
        /// Every running agent has passed its output phase.
        AfterAllOutputPhases = "after_all_output_phases",
        /// At least one agent generated output in the last round.
        AfterAllGeneratedOutput = "after_all_generated_output",
    }
}

event_family! {
    /// Generic string events.
    StringEvent => String {
        EditProduction = "edit_production",
        LoadLibrary = "load_library",
        Print = "print",
    }
}

event_family! {
    /// Call/response events raised from rule right-hand sides.
    RhsEvent => Rhs {
        /// A user-defined function implemented by a client.
        RhsUserFunction = "rhs_user_function",
        /// A free-form message addressed to whichever client answers.
        ClientMessage = "client_message",
    }
}

/// A kernel event.
///
/// Serialized as its stable wire name (e.g. `"after_phase_executed"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventId {
    System(SystemEvent),
    Run(RunEvent),
    Production(ProductionEvent),
    Agent(AgentEvent),
    Update(UpdateEvent),
    String(StringEvent),
    Rhs(RhsEvent),
}

impl EventId {
    /// Iterate over every event id, family by family.
    pub fn all() -> impl Iterator<Item = EventId> {
        SystemEvent::ALL
            .iter()
            .map(|e| EventId::from(*e))
            .chain(RunEvent::ALL.iter().map(|e| EventId::from(*e)))
            .chain(ProductionEvent::ALL.iter().map(|e| EventId::from(*e)))
            .chain(AgentEvent::ALL.iter().map(|e| EventId::from(*e)))
            .chain(UpdateEvent::ALL.iter().map(|e| EventId::from(*e)))
            .chain(StringEvent::ALL.iter().map(|e| EventId::from(*e)))
            .chain(RhsEvent::ALL.iter().map(|e| EventId::from(*e)))
    }

    /// The family this event belongs to.
    pub fn category(&self) -> EventCategory {
        match self {
            EventId::System(_) => EventCategory::System,
            EventId::Run(_) => EventCategory::Run,
            EventId::Production(_) => EventCategory::Production,
            EventId::Agent(_) => EventCategory::Agent,
            EventId::Update(_) => EventCategory::Update,
            EventId::String(_) => EventCategory::String,
            EventId::Rhs(_) => EventCategory::Rhs,
        }
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventId::System(e) => e.as_str(),
            EventId::Run(e) => e.as_str(),
            EventId::Production(e) => e.as_str(),
            EventId::Agent(e) => e.as_str(),
            EventId::Update(e) => e.as_str(),
            EventId::String(e) => e.as_str(),
            EventId::Rhs(e) => e.as_str(),
        }
    }

    /// Whether listeners of this event answer with a value.
    pub fn is_call_response(&self) -> bool {
        matches!(self, EventId::Rhs(_))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventId::all()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownEvent(s.to_string()))
    }
}

impl TryFrom<String> for EventId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.as_str().to_string()
    }
}

/// Phase of a decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Input,
    Proposal,
    Decision,
    Apply,
    Output,
}

impl Phase {
    /// Phases in execution order.
    pub const ALL: [Phase; 5] = [
        Phase::Input,
        Phase::Proposal,
        Phase::Decision,
        Phase::Apply,
        Phase::Output,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Input => "input",
            Phase::Proposal => "proposal",
            Phase::Decision => "decision",
            Phase::Apply => "apply",
            Phase::Output => "output",
        }
    }

    /// The phase that follows this one; output wraps around to input.
    pub fn next(&self) -> Phase {
        match self {
            Phase::Input => Phase::Proposal,
            Phase::Proposal => Phase::Decision,
            Phase::Decision => Phase::Apply,
            Phase::Apply => Phase::Output,
            Phase::Output => Phase::Input,
        }
    }

    /// Whether this phase closes a decision cycle.
    pub fn is_last(&self) -> bool {
        matches!(self, Phase::Output)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
