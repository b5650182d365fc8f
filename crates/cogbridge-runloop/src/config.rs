//! Configuration for the run scheduler.

use cogbridge_config::{Config, ConfigError};

use crate::request::Interleave;

/// Run scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Engine steps between two `interrupt_check` notifications (at least 1).
    pub interrupt_check_rate: u32,

    /// Interleave for multi-agent runs that do not name one.
    pub default_interleave: Interleave,

    /// Consecutive output-less decisions after which an until-output run
    /// gives up on an agent.
    pub max_nil_output_cycles: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interrupt_check_rate: 1,
            default_interleave: Interleave::Phase,
            max_nil_output_cycles: 15,
        }
    }
}

impl SchedulerConfig {
    /// Build from the `[kernel]` and `[scheduler]` file sections.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let default_interleave = config
            .scheduler
            .default_interleave
            .parse::<Interleave>()
            .map_err(|message| ConfigError::InvalidValue {
                field: "scheduler.default_interleave".to_string(),
                message,
            })?;

        Ok(Self {
            interrupt_check_rate: config.kernel.interrupt_check_rate.max(1),
            default_interleave,
            max_nil_output_cycles: config.scheduler.max_nil_output_cycles.max(1),
        })
    }

    pub fn with_interrupt_check_rate(mut self, rate: u32) -> Self {
        self.interrupt_check_rate = rate.max(1);
        self
    }

    pub fn with_default_interleave(mut self, interleave: Interleave) -> Self {
        self.default_interleave = interleave;
        self
    }

    pub fn with_max_nil_output_cycles(mut self, cycles: u32) -> Self {
        self.max_nil_output_cycles = cycles.max(1);
        self
    }
}
