//! Run requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use cogbridge_protocols::StepUnit;

use crate::error::RunError;

/// How far a run goes before it counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunGranularity {
    /// `count` elaboration cycles.
    Elaboration,
    /// `count` phases.
    Phase,
    /// `count` decision cycles.
    Decision,
    /// `count` decision cycles that generated output.
    UntilOutput,
    /// Until interrupted or every agent halts. `count` is ignored.
    Forever,
}

impl RunGranularity {
    pub const ALL: [RunGranularity; 5] = [
        RunGranularity::Elaboration,
        RunGranularity::Phase,
        RunGranularity::Decision,
        RunGranularity::UntilOutput,
        RunGranularity::Forever,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunGranularity::Elaboration => "elaboration",
            RunGranularity::Phase => "phase",
            RunGranularity::Decision => "decision",
            RunGranularity::UntilOutput => "until_output",
            RunGranularity::Forever => "forever",
        }
    }

    /// Unit used when no interleaving applies.
    pub fn natural_unit(&self) -> StepUnit {
        match self {
            RunGranularity::Elaboration => StepUnit::Elaboration,
            RunGranularity::Phase => StepUnit::Phase,
            RunGranularity::Decision | RunGranularity::UntilOutput | RunGranularity::Forever => {
                StepUnit::Decision
            }
        }
    }

    /// Whether completion is measured against `count`.
    pub fn is_counted(&self) -> bool {
        !matches!(self, RunGranularity::Forever)
    }
}

impl fmt::Display for RunGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunGranularity::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown run granularity '{}'", s))
    }
}

/// How turns rotate between agents in a multi-agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interleave {
    /// Each agent takes one elaboration per turn.
    Elaboration,
    /// Each agent takes one phase per turn.
    Phase,
    /// Each agent takes one decision cycle per turn.
    Decision,
    /// Each agent keeps its turn until it generates output.
    UntilOutput,
}

impl Interleave {
    pub const ALL: [Interleave; 4] = [
        Interleave::Elaboration,
        Interleave::Phase,
        Interleave::Decision,
        Interleave::UntilOutput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interleave::Elaboration => "elaboration",
            Interleave::Phase => "phase",
            Interleave::Decision => "decision",
            Interleave::UntilOutput => "until_output",
        }
    }

    /// Engine unit of one step within a turn.
    pub fn unit(&self) -> StepUnit {
        match self {
            Interleave::Elaboration => StepUnit::Elaboration,
            Interleave::Phase => StepUnit::Phase,
            Interleave::Decision | Interleave::UntilOutput => StepUnit::Decision,
        }
    }
}

impl fmt::Display for Interleave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interleave {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interleave::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| format!("unknown interleave '{}'", s))
    }
}

/// Which agents a run drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSelection {
    One(String),
    All,
}

/// A request to advance one or more agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub granularity: RunGranularity,
    /// Ignored for [`RunGranularity::Forever`].
    pub count: u64,
    pub agents: AgentSelection,
    /// Falls back to the scheduler's default when unset.
    #[serde(default)]
    pub interleave: Option<Interleave>,
}

impl RunRequest {
    /// Run every agent by `count` units of `granularity`.
    pub fn new(granularity: RunGranularity, count: u64) -> Self {
        Self {
            granularity,
            count,
            agents: AgentSelection::All,
            interleave: None,
        }
    }

    pub fn elaborations(count: u64) -> Self {
        Self::new(RunGranularity::Elaboration, count)
    }

    pub fn phases(count: u64) -> Self {
        Self::new(RunGranularity::Phase, count)
    }

    pub fn decisions(count: u64) -> Self {
        Self::new(RunGranularity::Decision, count)
    }

    pub fn until_output(count: u64) -> Self {
        Self::new(RunGranularity::UntilOutput, count)
    }

    pub fn forever() -> Self {
        Self::new(RunGranularity::Forever, 0)
    }

    /// Restrict the run to one agent.
    pub fn for_agent(mut self, agent: impl Into<String>) -> Self {
        self.agents = AgentSelection::One(agent.into());
        self
    }

    pub fn with_interleave(mut self, interleave: Interleave) -> Self {
        self.interleave = Some(interleave);
        self
    }

    /// Check the request on its own, before agents are resolved.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.granularity.is_counted() && self.count == 0 {
            return Err(RunError::InvalidCount(self.granularity));
        }
        Ok(())
    }

    /// Unit each engine step advances by.
    ///
    /// A single agent runs at the granularity's natural unit. Several
    /// agents use the interleave unit, clamped so that a turn never spans
    /// more than the run's own granularity.
    pub fn step_unit(&self, agent_count: usize, default_interleave: Interleave) -> StepUnit {
        let natural = self.granularity.natural_unit();
        if agent_count <= 1 {
            return natural;
        }
        let interleave = self.interleave.unwrap_or(default_interleave);
        interleave.unit().min(natural)
    }
}
