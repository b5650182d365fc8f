//! `run` subcommand: simulated agents driven by the run scheduler.

use std::sync::Arc;

use tracing::{debug, info, warn};

use cogbridge_config::{Config, ConfigValidator};
use cogbridge_core::{EventHub, HubConfig};
use cogbridge_protocols::{Connection, RhsEvent, SystemEvent};
use cogbridge_runloop::sim::{CycleEngine, EventSources, SimAgentSpec};
use cogbridge_runloop::{
    Interleave, KernelSession, RunGranularity, RunOutcome, RunRequest, SchedulerConfig,
};

use crate::cli::RunArgs;
use crate::stdout::StdoutConnection;

/// Handle the `run` subcommand.
pub(crate) async fn handle_run(
    args: RunArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    for warning in ConfigValidator::validate(config).into_result()? {
        warn!(path = %warning.path, "{}", warning.message);
    }

    let request = build_request(&args)?;
    let hub_config = HubConfig::from_millis(
        config.kernel.transport_timeout_ms,
        config.kernel.max_rhs_result_len,
    );
    let scheduler_config = SchedulerConfig::from_config(config)?;

    let sources = Arc::new(EventSources::new());
    let hub = Arc::new(EventHub::new(sources.clone(), hub_config));
    let engine = Arc::new(CycleEngine::new(hub.clone(), sources));
    let session = KernelSession::new(hub, engine.clone(), scheduler_config);

    let mut client = StdoutConnection::new("stdout").with_rhs_answer(args.rhs_answer.clone());
    let mut events = args.events.clone();
    if let Some(steps) = args.interrupt_after {
        client = client.interrupting_after(session.interrupt_handle(), steps);
        push_unique(&mut events, SystemEvent::InterruptCheck.as_str());
    }
    if args.rhs_answer.is_some() {
        push_unique(&mut events, RhsEvent::RhsUserFunction.as_str());
    }
    let client: Arc<dyn Connection> = Arc::new(client);
    for name in &events {
        session.subscribe_by_name(name, &client)?;
    }
    info!(events = ?events, "Client subscribed");

    session.start().await;
    for name in &args.agents {
        engine.create_agent(agent_spec(name, &args)).await?;
    }

    let interrupt = session.interrupt_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt requested from terminal");
            interrupt.request();
        }
    });

    let report = session.run_with_report(request).await;
    for agent in &report.agents {
        info!(
            agent = %agent.agent,
            steps = agent.steps,
            decisions = agent.decisions,
            outputs = agent.outputs,
            stop = ?agent.stop,
            "Agent summary"
        );
    }
    info!(
        run_id = %report.run_id,
        outcome = %report.outcome,
        steps = report.steps,
        "Run summary"
    );
    debug!(metrics = %serde_json::to_string(&session.metrics())?, "Kernel metrics");

    session.shutdown().await;

    match report.outcome {
        RunOutcome::Error(err) => Err(err.into()),
        _ => Ok(()),
    }
}

fn build_request(args: &RunArgs) -> Result<RunRequest, Box<dyn std::error::Error>> {
    let granularity: RunGranularity = args.granularity.parse()?;
    let mut request = RunRequest::new(granularity, args.count);
    if let Some(agent) = &args.agent {
        request = request.for_agent(agent.clone());
    }
    if let Some(interleave) = &args.interleave {
        request = request.with_interleave(interleave.parse::<Interleave>()?);
    }
    Ok(request)
}

fn agent_spec(name: &str, args: &RunArgs) -> SimAgentSpec {
    let mut spec = SimAgentSpec::new(name);
    if let Some(n) = args.output_every {
        spec = spec.output_every(n);
    }
    if let Some(n) = args.halt_after {
        spec = spec.halt_after(n);
    }
    for production in &args.productions {
        spec = spec.with_production(production.clone());
    }
    if let Some(function) = &args.rhs_function {
        spec = spec.with_rhs_function(function.clone());
    }
    spec
}

fn push_unique(events: &mut Vec<String>, name: &str) {
    if !events.iter().any(|e| e == name) {
        events.push(name.to_string());
    }
}
