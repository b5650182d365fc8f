//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub kernel: KernelConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Event layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Engine steps between two `interrupt_check` notifications.
    #[serde(default = "default_interrupt_check_rate")]
    pub interrupt_check_rate: u32,

    /// Upper bound on a single subscriber round trip (0 = unbounded).
    #[serde(default = "default_transport_timeout_ms")]
    pub transport_timeout_ms: u64,

    /// Largest RHS result accepted from a client, in bytes.
    #[serde(default = "default_max_rhs_result_len")]
    pub max_rhs_result_len: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            interrupt_check_rate: default_interrupt_check_rate(),
            transport_timeout_ms: default_transport_timeout_ms(),
            max_rhs_result_len: default_max_rhs_result_len(),
        }
    }
}

fn default_interrupt_check_rate() -> u32 {
    1
}

fn default_transport_timeout_ms() -> u64 {
    30_000
}

fn default_max_rhs_result_len() -> usize {
    4096
}

/// Run scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interleave used when a run selects several agents.
    #[serde(default = "default_interleave")]
    pub default_interleave: String,

    /// Consecutive output-less decisions after which run-until-output gives up.
    #[serde(default = "default_max_nil_output_cycles")]
    pub max_nil_output_cycles: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_interleave: default_interleave(),
            max_nil_output_cycles: default_max_nil_output_cycles(),
        }
    }
}

fn default_interleave() -> String {
    "phase".to_string()
}

fn default_max_nil_output_cycles() -> u32 {
    15
}

/// Interleave names accepted by `scheduler.default_interleave`.
pub const INTERLEAVE_NAMES: [&str; 4] = ["elaboration", "phase", "decision", "until_output"];

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Directory for daily rolling log files; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Console log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
