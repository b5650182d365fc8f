//! CLI definitions for cogbridge.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// cogbridge CLI.
#[derive(Parser)]
#[command(name = "cogbridge")]
#[command(about = "Event subscription and run scheduling for a symbolic reasoning kernel")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    /// Also write logs under ~/.cogbridge/logs when no log directory is configured
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run simulated agents and stream subscribed events as JSON lines
    Run(RunArgs),

    /// List event names
    Events {
        /// Only list one family (system, run, production, agent, update, string, rhs)
        #[arg(long)]
        family: Option<String>,
    },

    /// Load and validate the configuration file
    CheckConfig,
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// Agent names
    #[arg(long, value_delimiter = ',', default_value = "soar1")]
    pub agents: Vec<String>,

    /// Run granularity (elaboration, phase, decision, until_output, forever)
    #[arg(short, long, default_value = "decision")]
    pub granularity: String,

    /// Units to run; ignored for forever runs
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: u64,

    /// Only run this agent
    #[arg(long)]
    pub agent: Option<String>,

    /// Interleave for multi-agent runs (defaults to the configured one)
    #[arg(long)]
    pub interleave: Option<String>,

    /// Events to subscribe to
    #[arg(
        short,
        long = "event",
        value_delimiter = ',',
        default_value = "after_decision_cycle,print"
    )]
    pub events: Vec<String>,

    /// Agents generate output every N decisions
    #[arg(long)]
    pub output_every: Option<u64>,

    /// Agents halt after N decisions
    #[arg(long)]
    pub halt_after: Option<u64>,

    /// Productions fired in rotation during apply
    #[arg(long, value_delimiter = ',')]
    pub productions: Vec<String>,

    /// RHS function called whenever a production fires
    #[arg(long)]
    pub rhs_function: Option<String>,

    /// Answer every RHS call with this value
    #[arg(long)]
    pub rhs_answer: Option<String>,

    /// Request an interrupt once this many engine steps have been checked
    #[arg(long, env = "COGBRIDGE_INTERRUPT_AFTER")]
    pub interrupt_after: Option<u64>,
}
