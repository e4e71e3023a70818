//! Command-line entry for the protection build pipeline

use anyhow::{Context, Result};
use clap::Parser;
use shroud::{BuildConfig, BuildError, Pipeline, PipelineReport};
use std::path::PathBuf;
use std::process::ExitCode;

/// Build a source-protected distributable: compile modules to native
/// extensions, strip their sources from the tree, package, verify, restore.
#[derive(Parser)]
#[command(name = "shroud", version, about)]
struct Cli {
    /// Path to the build configuration (JSON)
    #[arg(short, long, default_value = "shroud.json")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep the compiler scratch directory for debugging
    #[arg(long)]
    keep_scratch: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading config {}", cli.config.display()))?;
    let mut config: BuildConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config {}", cli.config.display()))?;
    if cli.keep_scratch {
        config = config.keep_scratch(true);
    }

    let report = Pipeline::from_config(config).run();
    summarize(&report);
    Ok(exit_code(&report))
}

fn summarize(report: &PipelineReport) {
    if report.succeeded() {
        if let Some(archive) = &report.archive {
            tracing::info!("BUILD SUCCESSFUL - no source exposed in {}", archive.display());
        }
        return;
    }

    match &report.failure {
        Some(BuildError::Leak(entries)) => {
            tracing::error!("SOURCE EXPOSED IN OUTPUT:");
            for entry in entries {
                tracing::error!("  - {entry}");
            }
        }
        Some(failure) => tracing::error!("BUILD FAILED: {failure}"),
        None => {}
    }

    for failure in &report.restore_failures {
        tracing::error!(
            "SOURCE NOT RESTORED: {} (last seen at {}): {}",
            failure.original.display(),
            failure.backup.display(),
            failure.reason
        );
    }
}

/// Exit codes: 0 success, 1 build failure, 2 source exposed, 3 source not
/// restored (most severe, dominates).
fn exit_code(report: &PipelineReport) -> ExitCode {
    if !report.restore_failures.is_empty() {
        return ExitCode::from(3);
    }
    match &report.failure {
        None => ExitCode::SUCCESS,
        Some(BuildError::Leak(_)) => ExitCode::from(2),
        Some(_) => ExitCode::from(1),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
