//! Run outcomes and reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cogbridge_protocols::AgentId;

use crate::error::RunError;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every agent reached its count (or halted).
    Completed,
    /// An interrupt stopped the run, or a forever run ran out of agents.
    Interrupted,
    /// The last step both completed the run and saw an interrupt request.
    CompletedAndInterrupted,
    /// Nothing ran, or the engine failed part way.
    Error(RunError),
}

impl RunOutcome {
    /// Stable lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Interrupted => "interrupted",
            RunOutcome::CompletedAndInterrupted => "completed_and_interrupted",
            RunOutcome::Error(_) => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RunOutcome::Error(_))
    }

    pub fn was_interrupted(&self) -> bool {
        matches!(
            self,
            RunOutcome::Interrupted | RunOutcome::CompletedAndInterrupted
        )
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Error(err) => write!(f, "error: {}", err),
            other => f.write_str(other.label()),
        }
    }
}

/// Why an agent left the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStop {
    /// Still in the rotation.
    Running,
    /// Reached the requested count.
    Done,
    /// Gave up after too many decisions without output.
    NilOutputLimit,
    /// The engine reported the agent halted.
    Halted,
}

/// Per-agent progress within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentProgress {
    pub agent: AgentId,
    /// Engine steps taken.
    pub steps: u64,
    /// Units of the run's granularity completed.
    pub completed: u64,
    pub elaborations: u64,
    pub phases: u64,
    pub decisions: u64,
    /// Decisions that generated output.
    pub outputs: u64,
    /// Consecutive decisions without output.
    pub nil_outputs: u64,
    pub stop: AgentStop,
}

impl AgentProgress {
    pub fn new(agent: impl Into<AgentId>) -> Self {
        Self {
            agent: agent.into(),
            steps: 0,
            completed: 0,
            elaborations: 0,
            phases: 0,
            decisions: 0,
            outputs: 0,
            nil_outputs: 0,
            stop: AgentStop::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop == AgentStop::Running
    }
}

/// Full account of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    /// Engine steps across all agents.
    pub steps: u64,
    pub agents: Vec<AgentProgress>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Progress of one agent.
    pub fn agent(&self, name: &str) -> Option<&AgentProgress> {
        self.agents.iter().find(|p| p.agent == name)
    }
}
