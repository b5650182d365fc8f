//! cogbridge - event subscription and run scheduling for a symbolic
//! reasoning kernel.
//!
//! Main entry point for the cogbridge CLI.

mod cli;
mod cmd_inspect;
mod cmd_run;
mod stdout;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cogbridge_config::{ConfigLoader, LogFormat, LoggingConfig};

use crate::cli::{Cli, Commands};

/// Initialize tracing.
///
/// Console output goes to stderr so that stdout carries only event lines.
/// With a log directory configured, a daily rolling file is written too.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;

    let console = match logging.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let file = match &logging.directory {
        Some(dir) => {
            let log_dir = PathBuf::from(ConfigLoader::expand_path(dir));
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("cogbridge")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keeps the background writer alive for the program duration.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)?;
    let mut logging = config.logging.clone();
    if cli.log_file && logging.directory.is_none() {
        logging.directory = Some(ConfigLoader::default_log_dir().display().to_string());
    }
    init_tracing(&logging)?;
    info!("cogbridge v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => cmd_run::handle_run(args, &config).await,
        Commands::Events { family } => cmd_inspect::handle_events(family.as_deref()),
        Commands::CheckConfig => cmd_inspect::handle_check_config(&cli.config),
    }
}
