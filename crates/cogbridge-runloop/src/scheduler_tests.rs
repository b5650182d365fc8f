use super::*;

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use cogbridge_core::testing::RecordingConnection;
use cogbridge_protocols::{
    params, EngineError, RunEvent, StepReport, StepUnit, SystemEvent, UpdateEvent,
};

use crate::outcome::AgentStop;
use crate::request::Interleave;

#[derive(Debug, Clone, Default)]
struct AgentScript {
    /// Generate output every N decisions.
    output_every: Option<u64>,
    /// Halt after N decisions.
    halt_after: Option<u64>,
}

/// Engine whose steps follow a fixed script.
#[derive(Default)]
struct ScriptedEngine {
    agents: Vec<String>,
    scripts: HashMap<String, AgentScript>,
    decisions: Mutex<HashMap<String, u64>>,
    calls: Mutex<Vec<(String, StepUnit)>>,
    /// Fail the Nth step call (1-based).
    fail_at: Option<usize>,
    /// When set, each step signals `entered` and waits for `gate`.
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedEngine {
    fn new(agents: &[&str]) -> Self {
        Self {
            agents: agents.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    fn script(mut self, agent: &str, script: AgentScript) -> Self {
        self.scripts.insert(agent.to_string(), script);
        self
    }

    fn failing_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    fn gated(mut self, entered: Arc<Notify>, gate: Arc<Notify>) -> Self {
        self.gate = Some((entered, gate));
        self
    }

    fn calls(&self) -> Vec<(String, StepUnit)> {
        self.calls.lock().clone()
    }

    fn called_agents(&self) -> Vec<String> {
        self.calls().into_iter().map(|(agent, _)| agent).collect()
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn agent_list(&self) -> Vec<AgentId> {
        self.agents.clone()
    }

    async fn step(&self, agent: &str, unit: StepUnit) -> Result<StepReport, EngineError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push((agent.to_string(), unit));
            calls.len()
        };

        if let Some((entered, gate)) = &self.gate {
            entered.notify_one();
            gate.notified().await;
        }

        if self.fail_at == Some(call) {
            return Err(EngineError::StepFailed {
                agent: agent.to_string(),
                message: "scripted failure".to_string(),
            });
        }

        let script = self.scripts.get(agent).cloned().unwrap_or_default();
        let mut report = match unit {
            StepUnit::Elaboration => StepReport {
                elaborations: 1,
                ..StepReport::default()
            },
            StepUnit::Phase => StepReport {
                elaborations: 1,
                phases: 1,
                ..StepReport::default()
            },
            StepUnit::Decision => StepReport {
                elaborations: 5,
                phases: 5,
                decisions: 1,
                ..StepReport::default()
            },
        };

        if report.decisions > 0 {
            let mut decisions = self.decisions.lock();
            let total = decisions.entry(agent.to_string()).or_default();
            *total += 1;
            report.output_generated = script.output_every.is_some_and(|n| *total % n == 0);
            report.halted = script.halt_after.is_some_and(|n| *total >= n);
        }
        Ok(report)
    }
}

fn hub() -> Arc<EventHub> {
    Arc::new(EventHub::with_defaults())
}

fn scheduler(
    engine: ScriptedEngine,
    hub: &Arc<EventHub>,
) -> (RunScheduler, Arc<ScriptedEngine>) {
    scheduler_with(engine, hub, SchedulerConfig::default())
}

fn scheduler_with(
    engine: ScriptedEngine,
    hub: &Arc<EventHub>,
    config: SchedulerConfig,
) -> (RunScheduler, Arc<ScriptedEngine>) {
    let engine = Arc::new(engine);
    let scheduler = RunScheduler::new(engine.clone(), hub.clone(), config);
    (scheduler, engine)
}

/// Client that asks for an interrupt on every `interrupt_check`.
fn interrupting_client(handle: InterruptHandle) -> Arc<RecordingConnection> {
    Arc::new(RecordingConnection::new("interrupter").with_hook(move |msg| {
        if msg.event == SystemEvent::InterruptCheck.as_str() {
            handle.request();
        }
    }))
}

#[tokio::test]
async fn test_zero_agents_is_an_error() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&[]), &hub);

    let outcome = scheduler.schedule_run(RunRequest::decisions(1)).await;
    assert_eq!(outcome, RunOutcome::Error(RunError::NoAgents));
    assert!(engine.calls().is_empty());
    assert!(scheduler.is_idle());
}

#[tokio::test]
async fn test_zero_count_is_an_error() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&["soar1"]), &hub);

    let outcome = scheduler.schedule_run(RunRequest::phases(0)).await;
    assert_eq!(
        outcome,
        RunOutcome::Error(RunError::InvalidCount(crate::RunGranularity::Phase))
    );
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_agent_is_an_error() {
    let hub = hub();
    let (scheduler, _engine) = scheduler(ScriptedEngine::new(&["soar1"]), &hub);

    let outcome = scheduler
        .schedule_run(RunRequest::decisions(1).for_agent("soar9"))
        .await;
    assert_eq!(
        outcome,
        RunOutcome::Error(RunError::UnknownAgent("soar9".to_string()))
    );
    assert_eq!(scheduler.metrics().snapshot().runs_failed, 1);
}

#[tokio::test]
async fn test_single_agent_counted_run() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&["soar1", "soar2"]), &hub);

    let report = scheduler
        .run_with_report(RunRequest::phases(3).for_agent("soar2"))
        .await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.steps, 3);
    assert_eq!(engine.called_agents(), vec!["soar2"; 3]);
    assert!(engine.calls().iter().all(|(_, unit)| *unit == StepUnit::Phase));

    let progress = report.agent("soar2").unwrap();
    assert_eq!(progress.phases, 3);
    assert_eq!(progress.stop, AgentStop::Done);
    assert!(report.agent("soar1").is_none());
}

#[tokio::test]
async fn test_forever_run_interrupted_at_check() {
    let hub = hub();
    let config = SchedulerConfig::default().with_interrupt_check_rate(3);
    let (scheduler, engine) = scheduler_with(ScriptedEngine::new(&["soar1"]), &hub, config);
    let client = interrupting_client(scheduler.interrupt_handle());
    hub.system()
        .add(SystemEvent::InterruptCheck, &client.as_connection())
        .unwrap();

    let report = scheduler.run_with_report(RunRequest::forever()).await;

    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.steps, 3);
    assert_eq!(engine.calls().len(), 3);
    let checks = client.messages_for("interrupt_check");
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].param(params::COUNT), Some("3"));
}

#[tokio::test]
async fn test_interrupt_on_final_step() {
    let hub = hub();
    let (scheduler, _engine) = scheduler(ScriptedEngine::new(&["soar1"]), &hub);
    let client = interrupting_client(scheduler.interrupt_handle());
    hub.system()
        .add(SystemEvent::InterruptCheck, &client.as_connection())
        .unwrap();

    let outcome = scheduler.schedule_run(RunRequest::decisions(1)).await;
    assert_eq!(outcome, RunOutcome::CompletedAndInterrupted);
    assert!(outcome.was_interrupted());
}

#[tokio::test]
async fn test_interrupt_notifies_agents() {
    let hub = hub();
    let (scheduler, _engine) = scheduler(ScriptedEngine::new(&["soar1", "soar2"]), &hub);
    let client = interrupting_client(scheduler.interrupt_handle());
    hub.system()
        .add(SystemEvent::InterruptCheck, &client.as_connection())
        .unwrap();
    hub.run()
        .add(RunEvent::AfterInterrupt, &client.as_connection())
        .unwrap();

    let report = scheduler.run_with_report(RunRequest::decisions(5)).await;
    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.steps, 1);

    let agents: Vec<_> = client
        .messages_for("after_interrupt")
        .iter()
        .map(|m| m.param(params::AGENT).unwrap_or_default().to_string())
        .collect();
    assert_eq!(agents, vec!["soar1", "soar2"]);
}

/// Client that asks for an interrupt whenever it receives `event`.
fn interrupting_on(event: &'static str, handle: InterruptHandle) -> Arc<RecordingConnection> {
    Arc::new(RecordingConnection::new("interrupter").with_hook(move |msg| {
        if msg.event == event {
            handle.request();
        }
    }))
}

#[tokio::test]
async fn test_interrupt_from_round_update_after_final_step() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&["soar1"]), &hub);
    let client = interrupting_on("after_all_output_phases", scheduler.interrupt_handle());
    hub.update()
        .add(UpdateEvent::AfterAllOutputPhases, &client.as_connection())
        .unwrap();

    let outcome = scheduler.schedule_run(RunRequest::decisions(1)).await;
    assert_eq!(outcome, RunOutcome::CompletedAndInterrupted);
    assert_eq!(engine.calls().len(), 1);

    // Consumed by the run it was raised in.
    let outcome = scheduler.schedule_run(RunRequest::decisions(1)).await;
    assert_eq!(outcome, RunOutcome::CompletedAndInterrupted);
    assert_eq!(engine.calls().len(), 2);
}

#[tokio::test]
async fn test_interrupt_from_round_update_stops_before_next_step() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&["soar1"]), &hub);
    let client = interrupting_on("after_all_output_phases", scheduler.interrupt_handle());
    hub.update()
        .add(UpdateEvent::AfterAllOutputPhases, &client.as_connection())
        .unwrap();

    let report = scheduler.run_with_report(RunRequest::decisions(3)).await;
    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.steps, 1);
    assert_eq!(engine.calls().len(), 1);
}

#[tokio::test]
async fn test_interrupt_before_first_step() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&["soar1"]), &hub);
    let client = interrupting_on("before_run_starts", scheduler.interrupt_handle());
    hub.run()
        .add(RunEvent::BeforeRunStarts, &client.as_connection())
        .unwrap();
    hub.run()
        .add(RunEvent::AfterInterrupt, &client.as_connection())
        .unwrap();

    let report = scheduler.run_with_report(RunRequest::decisions(2)).await;
    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.steps, 0);
    assert!(engine.calls().is_empty());
    assert_eq!(client.messages_for("after_interrupt").len(), 1);
}

#[tokio::test]
async fn test_interrupt_check_rate() {
    let hub = hub();
    let config = SchedulerConfig::default().with_interrupt_check_rate(2);
    let (scheduler, _engine) = scheduler_with(ScriptedEngine::new(&["soar1"]), &hub, config);
    let client = Arc::new(RecordingConnection::new("client"));
    hub.system()
        .add(SystemEvent::InterruptCheck, &client.as_connection())
        .unwrap();

    let outcome = scheduler.schedule_run(RunRequest::decisions(5)).await;
    assert_eq!(outcome, RunOutcome::Completed);

    let counts: Vec<_> = client
        .messages()
        .iter()
        .map(|m| m.param(params::COUNT).unwrap_or_default().to_string())
        .collect();
    assert_eq!(counts, vec!["2", "4"]);
    assert_eq!(scheduler.metrics().snapshot().interrupt_checks, 2);
}

#[tokio::test]
async fn test_stale_interrupt_is_discarded() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&["soar1"]), &hub);

    scheduler.request_interrupt();
    let outcome = scheduler.schedule_run(RunRequest::decisions(2)).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(engine.calls().len(), 2);
}

#[tokio::test]
async fn test_round_robin_interleave() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&["soar1", "soar2"]), &hub);

    let outcome = scheduler.schedule_run(RunRequest::phases(2)).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        engine.called_agents(),
        vec!["soar1", "soar2", "soar1", "soar2"]
    );
}

#[tokio::test]
async fn test_explicit_decision_interleave() {
    let hub = hub();
    let (scheduler, engine) = scheduler(ScriptedEngine::new(&["soar1", "soar2"]), &hub);

    let request = RunRequest::decisions(1).with_interleave(Interleave::Decision);
    let outcome = scheduler.schedule_run(request).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert!(engine.calls().iter().all(|(_, unit)| *unit == StepUnit::Decision));
    assert_eq!(engine.called_agents(), vec!["soar1", "soar2"]);
}

#[tokio::test]
async fn test_until_output_interleave_keeps_turn() {
    let hub = hub();
    let engine = ScriptedEngine::new(&["soar1", "soar2"])
        .script(
            "soar1",
            AgentScript {
                output_every: Some(1),
                ..AgentScript::default()
            },
        )
        .script(
            "soar2",
            AgentScript {
                output_every: Some(2),
                ..AgentScript::default()
            },
        );
    let (scheduler, engine) = scheduler(engine, &hub);

    let request = RunRequest::decisions(2).with_interleave(Interleave::UntilOutput);
    let outcome = scheduler.schedule_run(request).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        engine.called_agents(),
        vec!["soar1", "soar2", "soar2", "soar1"]
    );
}

#[tokio::test]
async fn test_until_output_gives_up_after_nil_cycles() {
    let hub = hub();
    let config = SchedulerConfig::default().with_max_nil_output_cycles(3);
    let (scheduler, engine) = scheduler_with(ScriptedEngine::new(&["soar1"]), &hub, config);

    let report = scheduler.run_with_report(RunRequest::until_output(1)).await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(engine.calls().len(), 3);
    assert_eq!(
        report.agent("soar1").unwrap().stop,
        AgentStop::NilOutputLimit
    );
}

#[tokio::test]
async fn test_until_output_counts_outputs() {
    let hub = hub();
    let engine = ScriptedEngine::new(&["soar1"]).script(
        "soar1",
        AgentScript {
            output_every: Some(2),
            ..AgentScript::default()
        },
    );
    let (scheduler, engine) = scheduler(engine, &hub);

    let report = scheduler.run_with_report(RunRequest::until_output(2)).await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(engine.calls().len(), 4);
    assert_eq!(report.agent("soar1").unwrap().outputs, 2);
}

#[tokio::test]
async fn test_forever_run_ends_when_all_agents_halt() {
    let hub = hub();
    let engine = ScriptedEngine::new(&["soar1"]).script(
        "soar1",
        AgentScript {
            halt_after: Some(2),
            ..AgentScript::default()
        },
    );
    let (scheduler, _engine) = scheduler(engine, &hub);
    let client = Arc::new(RecordingConnection::new("client"));
    hub.run()
        .add(RunEvent::AfterInterrupt, &client.as_connection())
        .unwrap();

    let report = scheduler.run_with_report(RunRequest::forever()).await;
    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.steps, 2);
    assert_eq!(report.agent("soar1").unwrap().stop, AgentStop::Halted);
    assert!(client.messages().is_empty());
}

#[tokio::test]
async fn test_engine_error_still_ends_run() {
    let hub = hub();
    let (scheduler, _engine) = scheduler(ScriptedEngine::new(&["soar1"]).failing_at(2), &hub);
    let client = Arc::new(RecordingConnection::new("client"));
    hub.run()
        .add(RunEvent::BeforeRunStarts, &client.as_connection())
        .unwrap();
    hub.run()
        .add(RunEvent::AfterRunEnds, &client.as_connection())
        .unwrap();

    let outcome = scheduler.schedule_run(RunRequest::decisions(3)).await;
    assert!(matches!(outcome, RunOutcome::Error(RunError::Engine(_))));
    assert_eq!(client.event_names(), vec!["before_run_starts", "after_run_ends"]);
    assert!(scheduler.is_idle());
}

#[tokio::test]
async fn test_round_updates() {
    let hub = hub();
    let engine = ScriptedEngine::new(&["soar1", "soar2"]).script(
        "soar1",
        AgentScript {
            output_every: Some(1),
            ..AgentScript::default()
        },
    );
    let (scheduler, _engine) = scheduler(engine, &hub);
    let client = Arc::new(RecordingConnection::new("client"));
    hub.update()
        .add(UpdateEvent::AfterAllOutputPhases, &client.as_connection())
        .unwrap();
    hub.update()
        .add(UpdateEvent::AfterAllGeneratedOutput, &client.as_connection())
        .unwrap();

    let request = RunRequest::decisions(1).with_interleave(Interleave::Decision);
    scheduler.schedule_run(request).await;

    let messages = client.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].event, "after_all_output_phases");
    assert_eq!(messages[0].param(params::VALUE), Some("2"));
    assert_eq!(messages[1].event, "after_all_generated_output");
    assert_eq!(messages[1].param(params::VALUE), Some("1"));
}

#[tokio::test]
async fn test_second_run_rejected_while_executing() {
    let hub = hub();
    let entered = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let engine = ScriptedEngine::new(&["soar1"]).gated(entered.clone(), gate.clone());
    let (scheduler, engine) = scheduler(engine, &hub);
    let scheduler = Arc::new(scheduler);

    let running = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.schedule_run(RunRequest::decisions(1)).await })
    };
    entered.notified().await;
    assert_eq!(scheduler.state(), SchedulerState::Executing);

    let rejected = scheduler.schedule_run(RunRequest::decisions(1)).await;
    assert_eq!(rejected, RunOutcome::Error(RunError::AlreadyRunning));
    assert_eq!(scheduler.state(), SchedulerState::Executing);

    gate.notify_one();
    assert_eq!(running.await.unwrap(), RunOutcome::Completed);
    assert!(scheduler.is_idle());
    assert_eq!(engine.calls().len(), 1);
}
