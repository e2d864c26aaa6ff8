use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ptydrive::scenario::{ScenarioConfig, ScenarioRunner};
use ptydrive::sink::Transcript;

/// Run a send/expect scenario file against an interactive process.
#[derive(Parser)]
#[command(name = "ptydrive", version)]
struct Cli {
    /// Path to a TOML scenario file.
    scenario: PathBuf,

    /// Override the scenario's default per-expectation timeout (seconds).
    #[arg(long)]
    timeout: Option<u64>,

    /// Mirror all bytes sent and received into this file.
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = ScenarioConfig::load(&cli.scenario)
        .with_context(|| format!("loading {}", cli.scenario.display()))?;

    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.default_timeout());

    let log_path = cli.log.clone().or_else(|| config.log.clone());
    let transcript = log_path
        .map(|path| {
            Transcript::to_file(&path)
                .with_context(|| format!("opening log file {}", path.display()))
        })
        .transpose()?;

    let scenario = config.to_scenario()?;
    let mut runner = ScenarioRunner::new(config.spawn_config()).timeout(timeout);
    if let Some(transcript) = transcript {
        runner = runner.transcript(transcript);
    }

    let report = runner.run(&scenario);
    match &report.failure {
        None => {
            println!("PASS ({} steps)", report.steps_run);
            Ok(ExitCode::SUCCESS)
        }
        Some(err) => {
            eprintln!("FAIL at step {}: {err}", report.steps_run + 1);
            Ok(ExitCode::FAILURE)
        }
    }
}
