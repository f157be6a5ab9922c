//! Scenario sweep runner: composes each scenario's geometry, runs the solver,
//! reduces its results to per-location metrics and writes the metric grids,
//! result matrices and baseline comparisons as JSON.
//!
//! Output layout:
//!   {output}/metrics.json            all five metric grids
//!   {output}/{metric}.json           matrix + percent difference per metric
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sweep_core::composer::clear_stale_slot;
use sweep_core::matrix::report_all;
use sweep_core::{RunConfig, Sweep};
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sweep_runner", about = "Run every scenario through the solver and compare metrics")]
struct Args {
    /// Path to the sweep configuration JSON
    #[arg(short, long, default_value = "sweep.json")]
    config: PathBuf,

    /// Output directory (created if absent)
    #[arg(short, long, default_value = "results")]
    output: PathBuf,

    /// Remove a terrain file left in the active slot by an interrupted run
    #[arg(long)]
    clear_slot: bool,

    /// Override the configured wet-depth threshold
    #[arg(long)]
    min_depth: Option<f64>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Write failed: {}", path.display()))
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = RunConfig::from_file(&args.config)
        .with_context(|| format!("Cannot load config {}", args.config.display()))?;
    if let Some(min_depth) = args.min_depth {
        config.min_depth = min_depth;
    }

    // Catalogs are parsed in full before the project is touched.
    let sweep = Sweep::load(&config).context("Cannot load sweep inputs")?;

    if args.clear_slot {
        clear_stale_slot(&sweep.layout).context("Cannot clear active terrain slot")?;
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Cannot create {}", args.output.display()))?;

    let mut engine = config.command_engine();
    let set = sweep.run(&mut engine).context("Sweep aborted")?;

    // Raw grids first: they are complete even if a comparison fails below.
    write_json(&args.output.join("metrics.json"), &set)?;

    let reports = report_all(&set).context("Cannot build comparison matrices")?;
    for report in &reports {
        let path = args.output.join(format!("{}.json", report.kind.label()));
        write_json(&path, report)?;
        tracing::info!(
            metric = report.kind.label(),
            scenarios = report.matrix.rows.len(),
            locations = report.matrix.columns.len(),
            path = %path.display(),
            "report written"
        );
    }

    Ok(())
}
