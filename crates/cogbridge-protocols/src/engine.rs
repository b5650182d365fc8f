//! Engine protocol definitions.
//!
//! The reasoning engine itself lives outside this workspace. The kernel
//! sees it through two seams: [`EventSourceControl`], toggled when an event
//! gains its first or loses its last subscriber, and [`Engine`], which the
//! run scheduler steps one unit at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::event::EventId;

/// Agent identifier (the agent's name).
pub type AgentId = String;

/// Smallest amount of work the scheduler asks the engine to perform.
///
/// Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepUnit {
    Elaboration,
    Phase,
    Decision,
}

/// Progress made by a single [`Engine::step`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Elaboration cycles completed.
    pub elaborations: u64,
    /// Phases completed.
    pub phases: u64,
    /// Decision cycles completed.
    pub decisions: u64,
    /// Whether a completed output phase produced output.
    pub output_generated: bool,
    /// Whether the agent halted and cannot be stepped again.
    pub halted: bool,
}

impl StepReport {
    /// A report for an agent that halted without further progress.
    pub fn halted() -> Self {
        Self {
            halted: true,
            ..Self::default()
        }
    }
}

/// Engine hooks toggled by the kernel.
///
/// The engine only needs to produce occurrences for events that are
/// enabled; disabled events are never dispatched anyway.
pub trait EventSourceControl: Send + Sync {
    /// An event gained its first subscriber.
    fn enable_event_source(&self, event: EventId);

    /// An event lost its last subscriber.
    fn disable_event_source(&self, event: EventId);
}

/// Source control for engines that always emit everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSourceControl;

impl EventSourceControl for NoopSourceControl {
    fn enable_event_source(&self, _event: EventId) {}

    fn disable_event_source(&self, _event: EventId) {}
}

/// The reasoning engine as seen by the run scheduler.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Agents currently registered with the engine.
    fn agent_list(&self) -> Vec<AgentId>;

    /// Advance one agent by one unit.
    async fn step(&self, agent: &str, unit: StepUnit) -> Result<StepReport, EngineError>;
}
