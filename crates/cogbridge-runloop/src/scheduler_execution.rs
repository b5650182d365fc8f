//! Run execution loop.

use tracing::{debug, error, info, warn};

use cogbridge_protocols::{RunEvent, StepReport, UpdateEvent};

use crate::outcome::{AgentProgress, AgentStop, RunOutcome};
use crate::request::{Interleave, RunGranularity, RunRequest};
use crate::scheduler::RunScheduler;

/// What happened to each agent during one interleave round.
#[derive(Debug, Default)]
struct RoundTally {
    /// Agents that passed their output phase.
    decided: usize,
    /// Agents whose output phase generated output.
    generated: usize,
}

impl RunScheduler {
    /// Step the agents in `progress` until the run ends.
    pub(crate) async fn execute(
        &self,
        request: &RunRequest,
        progress: &mut [AgentProgress],
        steps: &mut u64,
    ) -> RunOutcome {
        let unit = request.step_unit(progress.len(), self.config.default_interleave);
        let keep_turn_until_output = progress.len() > 1
            && request.interleave.unwrap_or(self.config.default_interleave)
                == Interleave::UntilOutput;
        let rate = u64::from(self.config.interrupt_check_rate.max(1));
        debug!(unit = ?unit, keep_turn_until_output, "Step plan");

        for agent in progress.iter() {
            self.hub.run().fire(RunEvent::BeforeRunStarts, &agent.agent).await;
        }

        let outcome = loop {
            if progress.iter().all(|p| !p.is_running()) {
                break if request.granularity.is_counted() {
                    RunOutcome::Completed
                } else {
                    // Nothing left to step in a forever run: the engine
                    // stopped every agent.
                    RunOutcome::Interrupted
                };
            }

            let mut round = RoundTally::default();
            // Some(run_complete) once an interrupt has been observed.
            let mut interrupted: Option<bool> = None;

            for index in 0..progress.len() {
                if !progress[index].is_running() {
                    continue;
                }

                let mut decided = false;
                let mut generated = false;
                let mut turn_nil_outputs = 0u32;

                loop {
                    if self.interrupt.take() {
                        interrupted = Some(run_complete(request, progress));
                        break;
                    }

                    let agent = progress[index].agent.clone();
                    let report = match self.engine.step(&agent, unit).await {
                        Ok(report) => report,
                        Err(err) => {
                            error!(agent = %agent, error = %err, "Engine step failed");
                            self.fire_run_ends(progress).await;
                            return RunOutcome::Error(err.into());
                        }
                    };

                    *steps += 1;
                    self.metrics.record_step();
                    self.apply_report(request, &mut progress[index], &report);
                    decided |= report.decisions > 0;
                    generated |= report.output_generated;
                    if report.decisions > 0 && !report.output_generated {
                        turn_nil_outputs += 1;
                    }

                    if *steps % rate == 0 {
                        self.metrics.record_interrupt_check();
                        self.hub.system().interrupt_check(*steps).await;
                    }

                    if self.interrupt.take() {
                        interrupted = Some(run_complete(request, progress));
                        break;
                    }

                    let keep_turn = keep_turn_until_output
                        && progress[index].is_running()
                        && !report.output_generated
                        && turn_nil_outputs < self.config.max_nil_output_cycles;
                    if !keep_turn {
                        break;
                    }
                }

                round.decided += usize::from(decided);
                round.generated += usize::from(generated);
                if interrupted.is_some() {
                    break;
                }
            }

            self.fire_round_updates(&round).await;
            if interrupted.is_none() && self.interrupt.take() {
                interrupted = Some(run_complete(request, progress));
            }

            if let Some(completed) = interrupted {
                info!(steps = *steps, "Run interrupted");
                for agent in progress.iter().filter(|p| p.stop != AgentStop::Halted) {
                    self.hub.run().fire(RunEvent::AfterInterrupt, &agent.agent).await;
                }
                break if completed {
                    RunOutcome::CompletedAndInterrupted
                } else {
                    RunOutcome::Interrupted
                };
            }
        };

        self.fire_run_ends(progress).await;
        outcome
    }

    /// Fold one step's report into the agent's progress and decide whether
    /// the agent leaves the rotation.
    fn apply_report(
        &self,
        request: &RunRequest,
        progress: &mut AgentProgress,
        report: &StepReport,
    ) {
        progress.steps += 1;
        progress.elaborations += report.elaborations;
        progress.phases += report.phases;
        progress.decisions += report.decisions;
        if report.output_generated {
            progress.outputs += 1;
            progress.nil_outputs = 0;
        } else {
            progress.nil_outputs += report.decisions;
        }

        progress.completed += match request.granularity {
            RunGranularity::Elaboration => report.elaborations,
            RunGranularity::Phase => report.phases,
            RunGranularity::Decision | RunGranularity::Forever => report.decisions,
            RunGranularity::UntilOutput => u64::from(report.output_generated),
        };

        if request.granularity.is_counted() && progress.completed >= request.count {
            debug!(agent = %progress.agent, completed = progress.completed, "Agent done");
            progress.stop = AgentStop::Done;
        } else if report.halted {
            info!(agent = %progress.agent, "Agent halted");
            progress.stop = AgentStop::Halted;
        } else if request.granularity == RunGranularity::UntilOutput
            && progress.nil_outputs >= u64::from(self.config.max_nil_output_cycles)
        {
            warn!(
                agent = %progress.agent,
                cycles = progress.nil_outputs,
                "No output generated, giving up on agent"
            );
            progress.stop = AgentStop::NilOutputLimit;
        }
    }

    async fn fire_round_updates(&self, round: &RoundTally) {
        if round.decided > 0 {
            self.hub
                .update()
                .fire(UpdateEvent::AfterAllOutputPhases, &round.decided.to_string())
                .await;
        }
        if round.generated > 0 {
            self.hub
                .update()
                .fire(UpdateEvent::AfterAllGeneratedOutput, &round.generated.to_string())
                .await;
        }
    }

    async fn fire_run_ends(&self, progress: &[AgentProgress]) {
        for agent in progress {
            self.hub.run().fire(RunEvent::AfterRunEnds, &agent.agent).await;
        }
    }
}

/// Whether a counted run already reached its target when interrupted.
fn run_complete(request: &RunRequest, progress: &[AgentProgress]) -> bool {
    request.granularity.is_counted() && progress.iter().all(|p| !p.is_running())
}
