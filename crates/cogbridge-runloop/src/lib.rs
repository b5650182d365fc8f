//! # cogbridge Run Loop
//!
//! Run scheduling for the cogbridge kernel.
//!
//! ## Components
//!
//! - [`RunScheduler`] - Steps agents round-robin under a [`RunRequest`]
//! - [`InterruptHandle`] - Cooperative stop between engine steps
//! - [`KernelSession`] - Client-facing entry point over hub and scheduler
//! - [`sim::CycleEngine`] - Deterministic simulated engine
//!
//! ## Run outcomes
//!
//! A run ends in exactly one [`RunOutcome`]: completed, interrupted,
//! completed and interrupted on the same step, or an error.

pub mod config;
pub mod error;
pub mod interrupt;
pub mod metrics;
pub mod outcome;
pub mod request;
pub mod scheduler;
mod scheduler_execution;
pub mod session;
pub mod sim;
pub mod state;

pub use config::SchedulerConfig;
pub use error::{RunError, RunResult};
pub use interrupt::InterruptHandle;
pub use metrics::{SchedulerMetrics, SchedulerMetricsSnapshot};
pub use outcome::{AgentProgress, AgentStop, RunOutcome, RunReport};
pub use request::{AgentSelection, Interleave, RunGranularity, RunRequest};
pub use scheduler::RunScheduler;
pub use session::{KernelSession, SessionMetrics};
pub use state::SchedulerState;
