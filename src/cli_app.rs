//! Top-level CLI definition and dispatch.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::control;

use failover_drill_helper::audit::archive::FsArchive;
use failover_drill_helper::audit::log::AuditLog;
use failover_drill_helper::controller::sim::SimulatedSitePair;
use failover_drill_helper::core::config::Config;
use failover_drill_helper::core::errors::Result;
use failover_drill_helper::model::scenario::{FailoverScenario, VerifyDefaults};
use failover_drill_helper::orchestrator::Orchestrator;
use failover_drill_helper::report;

/// Failover Drill Helper — exercises a primary/secondary pair through
/// controlled stop/verify/restore cycles.
#[derive(Debug, Parser)]
#[command(
    name = "fdh",
    author,
    version,
    about = "Failover Drill Helper - DR drill orchestrator",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the standard drill against a simulated site pair.
    Rehearse(RehearseArgs),
    /// Check the config and scenario without touching anything.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct RehearseArgs {
    /// Status reads that report "transitioning" after each simulated action.
    #[arg(long, default_value_t = 2)]
    transition_polls: u32,
    /// Skip the local JSONL sink; keep the audit log memory-only.
    #[arg(long)]
    no_local_log: bool,
}

/// Dispatch a parsed CLI invocation. Returns the process exit code.
pub fn run(args: &Cli) -> Result<i32> {
    if args.no_color {
        control::set_override(false);
    }
    let config = Config::load(args.config.as_deref())?;
    match &args.command {
        Command::Rehearse(rehearse) => run_rehearse(&config, rehearse, args.json),
        Command::Validate => run_validate(&config, args.json),
    }
}

/// Rehearsal timings: the simulator settles in a handful of polls, so
/// production wait ceilings would only add dead air.
const REHEARSE_VERIFY: VerifyDefaults = VerifyDefaults {
    max_wait: Duration::from_secs(2),
    poll_interval: Duration::from_millis(20),
    min_consistent_observations: 2,
};
const REHEARSE_BUDGET: Duration = Duration::from_secs(30);

fn run_rehearse(config: &Config, args: &RehearseArgs, json: bool) -> Result<i32> {
    let resources = config.drill_resources();
    let scenario = FailoverScenario::standard_pair_drill(
        config.drill.scenario_id.clone(),
        &resources,
        &REHEARSE_VERIFY,
    );
    let sim = SimulatedSitePair::with_transition_polls(resources, args.transition_polls);
    let archive = FsArchive::new(&config.paths.archive_dir);
    let mut audit = if args.no_local_log {
        AuditLog::in_memory(&config.drill.scenario_id)
    } else {
        AuditLog::with_local_sink(&config.drill.scenario_id, &config.paths.local_log)
    };

    let orchestrator = Orchestrator::new(&sim, &archive, config.retry_policy(), REHEARSE_BUDGET);
    let run = orchestrator.run(&scenario, &config.stable_hash()?, &mut audit);

    if json {
        println!("{}", report::render_json(&run)?);
    } else {
        print!("{}", report::render_text(&run));
    }
    Ok(report::exit_code(&run))
}

fn run_validate(config: &Config, json: bool) -> Result<i32> {
    let resources = config.drill_resources();
    let scenario = FailoverScenario::standard_pair_drill(
        config.drill.scenario_id.clone(),
        &resources,
        &config.verify_defaults(),
    );
    // Re-run the invariant check on the built steps; a hand-edited
    // scenario source would go through the same gate.
    let checked = FailoverScenario::new(scenario.id.clone(), scenario.steps().to_vec())?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "scenario_id": checked.id,
                "steps": checked.len(),
                "config_hash": config.stable_hash()?,
                "run_budget_secs": config.drill.run_budget_secs,
                "self_restoring": true,
            }))?
        );
    } else {
        println!("scenario '{}': {} steps, self-restoring", checked.id, checked.len());
        for step in checked.steps() {
            match &step.verify {
                Some(spec) => println!(
                    "  {:<28} {:<5} {:<32} verify {} on {}",
                    step.id,
                    step.action.label(),
                    step.target.to_string(),
                    spec.target,
                    spec.subject
                ),
                None => println!(
                    "  {:<28} {:<5} {}",
                    step.id,
                    step.action.label(),
                    step.target
                ),
            }
        }
        println!("config hash: {}", config.stable_hash()?);
    }
    Ok(0)
}
