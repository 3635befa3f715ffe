//! `steward run` supervises the governance workers until interrupted;
//! `steward once` runs every cycle a single time and exits.
//!
//! Exit codes: 0 normal stop, 1 unrecoverable failure, 2 emergency shutdown.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use steward_core::config::CliOverrides;
use steward_core::errors::StewardErrorCode;
use steward_core::traits::{Cancellable, CancellationToken};
use steward_core::StewardConfig;
use steward_runtime::{Orchestrator, RunOutcome};

#[derive(Parser)]
#[command(name = "steward", version, about = "Growth governance for a Markdown documentation corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the supervised workers until SIGINT/SIGTERM.
    Run(CommonArgs),
    /// Scan, detect, plan, execute, sample SLOs and report once.
    Once(CommonArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Config file to use instead of `<base>/steward.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Corpus root, relative to the base directory. Repeatable.
    #[arg(long = "root")]
    roots: Vec<String>,
    /// Working directory the roots and results root are resolved against.
    #[arg(long, default_value = ".")]
    base: PathBuf,
    #[arg(long)]
    results_root: Option<String>,
    /// Dispatch Ready plans without approval.
    #[arg(long)]
    auto_execute: bool,
}

impl CommonArgs {
    fn load(&self) -> Result<StewardConfig, steward_core::errors::ConfigError> {
        let overrides = CliOverrides {
            roots: self.roots.clone(),
            results_root: self.results_root.clone(),
            auto_execute: self.auto_execute.then_some(true),
            config_file: self.config.clone(),
            ..Default::default()
        };
        StewardConfig::load(&self.base, Some(&overrides))
    }
}

fn main() -> ExitCode {
    steward_core::tracing::init_tracing();
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run(args) => run(&args),
        Command::Once(args) => once(&args),
    };
    ExitCode::from(code)
}

fn open(args: &CommonArgs) -> Option<Orchestrator> {
    let config = match args.load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e.coded_string(), "invalid configuration");
            return None;
        }
    };
    match Orchestrator::open(config, &args.base) {
        Ok(orch) => Some(orch),
        Err(e) => {
            tracing::error!(error = %e.coded_string(), "startup failed");
            None
        }
    }
}

fn run(args: &CommonArgs) -> u8 {
    let Some(orch) = open(args) else { return 1 };
    let orch = Arc::new(orch);
    let stop = CancellationToken::new();

    let signals = Arc::new(AtomicU32::new(0));
    let handler = {
        let orch = Arc::clone(&orch);
        let stop = stop.clone();
        move || match signals.fetch_add(1, Ordering::SeqCst) {
            0 => {
                tracing::warn!("shutdown requested; draining running actions");
                stop.cancel();
            }
            _ => {
                tracing::warn!("second signal; rolling back running actions");
                orch.escalate_emergency();
            }
        }
    };
    if let Err(e) = ctrlc::set_handler(handler) {
        tracing::error!(error = %e, "cannot install signal handler");
        return 1;
    }

    match orch.run(&stop) {
        Ok(outcome) => {
            match &outcome {
                RunOutcome::Stopped => tracing::info!("stopped"),
                RunOutcome::EmergencyStop { reason } => tracing::warn!(%reason, "stopped in emergency mode"),
                RunOutcome::Fatal { worker, message } => tracing::error!(%worker, %message, "fatal worker error"),
            }
            outcome.exit_code() as u8
        }
        Err(e) => {
            tracing::error!(error = %e.coded_string(), "orchestrator failed");
            1
        }
    }
}

fn once(args: &CommonArgs) -> u8 {
    let Some(orch) = open(args) else { return 1 };
    match orch.run_once() {
        Ok(summary) => {
            let completed: usize = summary.executed.iter().map(|r| r.count("completed")).sum();
            let failed: usize = summary.executed.iter().map(|r| r.count("failed")).sum();
            let line = serde_json::json!({
                "files": summary.files,
                "violations_opened": summary.opened,
                "violations_closed": summary.closed,
                "plans": summary.plans,
                "actions_completed": completed,
                "actions_failed": failed,
                "recovered": summary.recovered,
                "health": summary.health.map(|h| h.overall),
                "emergency": summary.emergency,
                "reports": summary.reports,
            });
            println!("{line}");
            0
        }
        Err(e) => {
            tracing::error!(error = %e.coded_string(), "cycle failed");
            1
        }
    }
}
