//! Deterministic simulated engine.
//!
//! [`CycleEngine`] walks each agent through the decision-cycle phases
//! (input, proposal, decision, apply, output) and reports every boundary
//! through the [`EventHub`], the way a real reasoning engine would. It has
//! no rule matcher: productions fire in rotation during the apply phase and
//! output is generated on a fixed schedule. Used by the CLI and by tests.
//!
//! Like a real engine it only produces occurrences for events whose source
//! has been enabled through [`EventSources`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use parking_lot::Mutex;
use tracing::debug;

use cogbridge_core::{EventHub, RhsCallContext};
use cogbridge_protocols::{
    AgentEvent, AgentId, Engine, EngineError, EventId, EventSourceControl, Phase,
    ProductionEvent, RunEvent, StepReport, StepUnit, StringEvent,
};

/// Set of event sources the engine currently has to report.
#[derive(Debug, Default)]
pub struct EventSources {
    enabled: DashSet<EventId>,
}

impl EventSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, event: EventId) -> bool {
        self.enabled.contains(&event)
    }

    /// Enabled sources, in no particular order.
    pub fn enabled(&self) -> Vec<EventId> {
        self.enabled.iter().map(|e| *e).collect()
    }
}

impl EventSourceControl for EventSources {
    fn enable_event_source(&self, event: EventId) {
        self.enabled.insert(event);
    }

    fn disable_event_source(&self, event: EventId) {
        self.enabled.remove(&event);
    }
}

/// Behaviour of one simulated agent.
#[derive(Debug, Clone)]
pub struct SimAgentSpec {
    pub name: AgentId,
    /// Generate output every N decisions; never when `None`.
    pub output_every: Option<u64>,
    /// Halt after this many decisions.
    pub halt_after: Option<u64>,
    /// Productions fired in rotation, one per apply elaboration.
    pub productions: Vec<String>,
    /// RHS function called whenever a production fires.
    pub rhs_function: Option<String>,
}

impl SimAgentSpec {
    pub fn new(name: impl Into<AgentId>) -> Self {
        Self {
            name: name.into(),
            output_every: None,
            halt_after: None,
            productions: Vec::new(),
            rhs_function: None,
        }
    }

    pub fn output_every(mut self, decisions: u64) -> Self {
        self.output_every = Some(decisions);
        self
    }

    pub fn halt_after(mut self, decisions: u64) -> Self {
        self.halt_after = Some(decisions);
        self
    }

    pub fn with_production(mut self, name: impl Into<String>) -> Self {
        self.productions.push(name.into());
        self
    }

    pub fn with_rhs_function(mut self, name: impl Into<String>) -> Self {
        self.rhs_function = Some(name.into());
        self
    }
}

struct SimAgent {
    spec: SimAgentSpec,
    phase: Phase,
    /// Elaborations already done in the current phase.
    elaboration: u32,
    decisions: u64,
    fired: u64,
    halted: bool,
}

impl SimAgent {
    fn new(spec: SimAgentSpec) -> Self {
        Self {
            spec,
            phase: Phase::Input,
            elaboration: 0,
            decisions: 0,
            fired: 0,
            halted: false,
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Input;
        self.elaboration = 0;
        self.decisions = 0;
        self.fired = 0;
        self.halted = false;
    }
}

/// Occurrence produced under the agent lock and reported after it is
/// released.
enum Emission {
    Run(RunEvent),
    RunPhase(RunEvent, Phase),
    Production(ProductionEvent, String),
    Rhs { function: String, argument: String },
    Print(String),
}

/// Elaborations per phase: proposal and apply take two waves.
fn elaborations_in(phase: Phase) -> u32 {
    match phase {
        Phase::Proposal | Phase::Apply => 2,
        _ => 1,
    }
}

/// Deterministic engine driving simulated agents.
pub struct CycleEngine {
    hub: Arc<EventHub>,
    sources: Arc<EventSources>,
    agents: Mutex<Vec<SimAgent>>,
}

impl CycleEngine {
    /// `sources` must be the same set the hub was constructed with.
    pub fn new(hub: Arc<EventHub>, sources: Arc<EventSources>) -> Self {
        Self {
            hub,
            sources,
            agents: Mutex::new(Vec::new()),
        }
    }

    /// Create an agent and announce it.
    pub async fn create_agent(&self, spec: SimAgentSpec) -> Result<(), EngineError> {
        let name = spec.name.clone();
        {
            let mut agents = self.agents.lock();
            if agents.iter().any(|a| a.spec.name == name) {
                return Err(EngineError::Internal(format!("agent {} already exists", name)));
            }
            agents.push(SimAgent::new(spec));
        }
        self.emit_agent(AgentEvent::AfterAgentCreated, &name).await;
        Ok(())
    }

    /// Announce and remove an agent.
    pub async fn destroy_agent(&self, name: &str) -> Result<(), EngineError> {
        self.require_agent(name)?;
        self.emit_agent(AgentEvent::BeforeAgentDestroyed, name).await;
        self.agents.lock().retain(|a| a.spec.name != name);
        Ok(())
    }

    /// Put an agent back at the start of its first decision cycle.
    pub async fn reinitialize_agent(&self, name: &str) -> Result<(), EngineError> {
        self.require_agent(name)?;
        self.emit_agent(AgentEvent::BeforeAgentReinitialized, name).await;
        if let Some(agent) = self.agents.lock().iter_mut().find(|a| a.spec.name == name) {
            agent.reset();
        }
        self.emit_agent(AgentEvent::AfterAgentReinitialized, name).await;
        Ok(())
    }

    /// Add a production to an agent's rotation.
    pub async fn add_production(&self, agent: &str, production: &str) -> Result<(), EngineError> {
        {
            let mut agents = self.agents.lock();
            let sim = agents
                .iter_mut()
                .find(|a| a.spec.name == agent)
                .ok_or_else(|| EngineError::UnknownAgent(agent.to_string()))?;
            sim.spec.productions.push(production.to_string());
        }
        self.emit(
            agent,
            vec![Emission::Production(
                ProductionEvent::AfterProductionAdded,
                production.to_string(),
            )],
        )
        .await;
        Ok(())
    }

    /// Remove a production from an agent's rotation.
    ///
    /// Returns `false` if the agent had no such production.
    pub async fn remove_production(
        &self,
        agent: &str,
        production: &str,
    ) -> Result<bool, EngineError> {
        self.require_agent(agent)?;
        let known = self
            .agents
            .lock()
            .iter()
            .any(|a| a.spec.name == agent && a.spec.productions.iter().any(|p| p == production));
        if !known {
            return Ok(false);
        }

        self.emit(
            agent,
            vec![Emission::Production(
                ProductionEvent::BeforeProductionRemoved,
                production.to_string(),
            )],
        )
        .await;
        if let Some(sim) = self.agents.lock().iter_mut().find(|a| a.spec.name == agent) {
            sim.spec.productions.retain(|p| p != production);
        }
        Ok(true)
    }

    /// Decisions completed by an agent since creation or reinitialisation.
    pub fn decisions(&self, agent: &str) -> Option<u64> {
        self.agents
            .lock()
            .iter()
            .find(|a| a.spec.name == agent)
            .map(|a| a.decisions)
    }

    /// Phase an agent will execute next.
    pub fn current_phase(&self, agent: &str) -> Option<Phase> {
        self.agents
            .lock()
            .iter()
            .find(|a| a.spec.name == agent)
            .map(|a| a.phase)
    }

    fn require_agent(&self, name: &str) -> Result<(), EngineError> {
        if self.agents.lock().iter().any(|a| a.spec.name == name) {
            Ok(())
        } else {
            Err(EngineError::UnknownAgent(name.to_string()))
        }
    }

    async fn emit_agent(&self, event: AgentEvent, agent: &str) {
        if self.sources.is_enabled(event.into()) {
            self.hub.agent().fire(event, agent).await;
        }
    }

    /// Report queued occurrences in order, skipping disabled sources.
    async fn emit(&self, agent: &str, emissions: Vec<Emission>) {
        for emission in emissions {
            match emission {
                Emission::Run(event) => {
                    if self.sources.is_enabled(event.into()) {
                        self.hub.run().fire(event, agent).await;
                    }
                }
                Emission::RunPhase(event, phase) => {
                    if self.sources.is_enabled(event.into()) {
                        self.hub.run().fire_phase(event, agent, phase).await;
                    }
                }
                Emission::Production(event, production) => {
                    if self.sources.is_enabled(event.into()) {
                        self.hub.production().fire(event, agent, &production).await;
                    }
                }
                Emission::Rhs { function, argument } => {
                    let mut ctx = RhsCallContext::new(
                        function.as_str(),
                        argument,
                        self.hub.config().max_rhs_result_len,
                    );
                    if self.hub.rhs().invoke(&mut ctx).await {
                        if let Some(value) = ctx.take_result() {
                            self.print(&format!("{}: {} -> {}", agent, function, value))
                                .await;
                        }
                    }
                }
                Emission::Print(text) => self.print(&text).await,
            }
        }
    }

    async fn print(&self, text: &str) {
        if self.sources.is_enabled(StringEvent::Print.into()) {
            self.hub.string().fire(StringEvent::Print, text).await;
        }
    }
}

/// Advance `agent` by one elaboration, queueing what it crossed.
fn elaborate(agent: &mut SimAgent, out: &mut Vec<Emission>, report: &mut StepReport) {
    let phase = agent.phase;

    if agent.elaboration == 0 {
        if phase == Phase::Input {
            out.push(Emission::Run(RunEvent::BeforeDecisionCycle));
        }
        out.push(Emission::RunPhase(RunEvent::BeforePhaseExecuted, phase));
    }

    out.push(Emission::Run(RunEvent::BeforeSmallestStep));
    out.push(Emission::Run(RunEvent::BeforeElaborationCycle));
    if phase == Phase::Apply && !agent.spec.productions.is_empty() {
        let index = (agent.fired % agent.spec.productions.len() as u64) as usize;
        let production = agent.spec.productions[index].clone();
        agent.fired += 1;
        out.push(Emission::Production(
            ProductionEvent::AfterProductionFired,
            production.clone(),
        ));
        if let Some(function) = &agent.spec.rhs_function {
            out.push(Emission::Rhs {
                function: function.clone(),
                argument: production,
            });
        }
    }
    out.push(Emission::Run(RunEvent::AfterElaborationCycle));
    out.push(Emission::Run(RunEvent::AfterSmallestStep));

    report.elaborations += 1;
    agent.elaboration += 1;
    if agent.elaboration < elaborations_in(phase) {
        return;
    }

    out.push(Emission::RunPhase(RunEvent::AfterPhaseExecuted, phase));
    report.phases += 1;
    if phase.is_last() {
        agent.decisions += 1;
        report.decisions += 1;
        let outputs = agent
            .spec
            .output_every
            .is_some_and(|n| n > 0 && agent.decisions % n == 0);
        if outputs {
            report.output_generated = true;
            out.push(Emission::Print(format!(
                "{}: output at decision {}",
                agent.spec.name, agent.decisions
            )));
        }
        out.push(Emission::Run(RunEvent::AfterDecisionCycle));
        if agent.spec.halt_after.is_some_and(|n| agent.decisions >= n) {
            agent.halted = true;
            report.halted = true;
        }
    }
    agent.phase = phase.next();
    agent.elaboration = 0;
}

#[async_trait]
impl Engine for CycleEngine {
    fn agent_list(&self) -> Vec<AgentId> {
        self.agents
            .lock()
            .iter()
            .map(|a| a.spec.name.clone())
            .collect()
    }

    async fn step(&self, agent: &str, unit: StepUnit) -> Result<StepReport, EngineError> {
        let mut report = StepReport::default();
        let mut emissions = Vec::new();
        {
            let mut agents = self.agents.lock();
            let sim = agents
                .iter_mut()
                .find(|a| a.spec.name == agent)
                .ok_or_else(|| EngineError::UnknownAgent(agent.to_string()))?;
            if sim.halted {
                return Ok(StepReport::halted());
            }

            loop {
                elaborate(sim, &mut emissions, &mut report);
                let finished = match unit {
                    StepUnit::Elaboration => true,
                    StepUnit::Phase => report.phases > 0,
                    StepUnit::Decision => report.decisions > 0,
                };
                if finished || sim.halted {
                    break;
                }
            }
        }

        debug!(agent, unit = ?unit, emissions = emissions.len(), "Simulated step");
        self.emit(agent, emissions).await;
        Ok(report)
    }
}
