//! Run scheduler.
//!
//! Drives one or more agents through the engine under a [`RunRequest`]:
//! resolves the agent set, rotates turns round-robin, emits periodic
//! `interrupt_check` notifications and stops cooperatively between steps
//! when an interrupt has been requested.
//!
//! Only one run exists at a time. A request arriving while another run is
//! scheduling or executing is rejected with [`RunError::AlreadyRunning`]
//! without touching the engine.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cogbridge_core::EventHub;
use cogbridge_protocols::{AgentId, Engine};

use crate::config::SchedulerConfig;
use crate::error::{RunError, RunResult};
use crate::interrupt::InterruptHandle;
use crate::metrics::SchedulerMetrics;
use crate::outcome::{AgentProgress, RunOutcome, RunReport};
use crate::request::{AgentSelection, RunRequest};
use crate::state::SchedulerState;

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

/// Run scheduler.
pub struct RunScheduler {
    pub(crate) engine: Arc<dyn Engine>,
    pub(crate) hub: Arc<EventHub>,
    pub(crate) config: SchedulerConfig,
    state: AtomicU8,
    pub(crate) interrupt: InterruptHandle,
    pub(crate) metrics: Arc<SchedulerMetrics>,
}

/// Puts the scheduler back to `Idle` however the run ends, including when
/// the run future is dropped part way.
struct IdleOnDrop<'a>(&'a AtomicU8);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(SchedulerState::Idle as u8, Ordering::SeqCst);
    }
}

impl RunScheduler {
    /// Create a new scheduler.
    pub fn new(engine: Arc<dyn Engine>, hub: Arc<EventHub>, config: SchedulerConfig) -> Self {
        Self {
            engine,
            hub,
            config,
            state: AtomicU8::new(SchedulerState::Idle as u8),
            interrupt: InterruptHandle::new(),
            metrics: Arc::new(SchedulerMetrics::new()),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SchedulerState::Idle
    }

    /// Handle for interrupting runs of this scheduler.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Ask the current run to stop after its current step.
    pub fn request_interrupt(&self) {
        self.interrupt.request();
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<SchedulerMetrics> {
        &self.metrics
    }

    /// Run and return only the outcome.
    pub async fn schedule_run(&self, request: RunRequest) -> RunOutcome {
        self.run_with_report(request).await.outcome
    }

    /// Run and return a full report.
    pub async fn run_with_report(&self, request: RunRequest) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        if self
            .state
            .compare_exchange(
                SchedulerState::Idle as u8,
                SchedulerState::Scheduling as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            warn!(run_id = %run_id, state = %self.state(), "Run rejected, scheduler busy");
            return self.rejected(run_id, started_at, RunError::AlreadyRunning);
        }
        let _idle = IdleOnDrop(&self.state);

        let agents = match self.resolve_agents(&request) {
            Ok(agents) => agents,
            Err(err) => {
                warn!(run_id = %run_id, error = %err, "Run rejected");
                return self.rejected(run_id, started_at, err);
            }
        };

        if self.interrupt.take() {
            debug!(run_id = %run_id, "Discarding interrupt requested while idle");
        }

        self.set_state(SchedulerState::Executing);
        self.metrics.record_run_started();
        info!(
            run_id = %run_id,
            granularity = %request.granularity,
            count = request.count,
            agents = agents.len(),
            "Run started"
        );

        let mut progress: Vec<AgentProgress> =
            agents.into_iter().map(AgentProgress::new).collect();
        let mut steps = 0;
        let outcome = self.execute(&request, &mut progress, &mut steps).await;

        self.metrics.record_outcome(&outcome);
        info!(run_id = %run_id, outcome = %outcome, steps, "Run finished");

        RunReport {
            run_id,
            outcome,
            steps,
            agents: progress,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Validate the request and resolve the agent set.
    fn resolve_agents(&self, request: &RunRequest) -> RunResult<Vec<AgentId>> {
        request.validate()?;

        let available = self.engine.agent_list();
        let agents = match &request.agents {
            AgentSelection::All => available,
            AgentSelection::One(name) => {
                if !available.iter().any(|a| a == name) {
                    return Err(RunError::UnknownAgent(name.clone()));
                }
                vec![name.clone()]
            }
        };

        if agents.is_empty() {
            return Err(RunError::NoAgents);
        }
        Ok(agents)
    }

    fn rejected(
        &self,
        run_id: String,
        started_at: chrono::DateTime<Utc>,
        err: RunError,
    ) -> RunReport {
        let outcome = RunOutcome::Error(err);
        self.metrics.record_outcome(&outcome);
        RunReport {
            run_id,
            outcome,
            steps: 0,
            agents: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }
}
