//! Re-pivot a sweep's metric grids with an explicit scenario and location
//! order. The first scenario in the order is the comparison baseline.
//!
//! A `--locations` order applies to each metric's own columns: names a grid
//! does not carry (a location without faces, for stream power) are skipped.
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use sweep_core::matrix::metric_report;
use sweep_core::{MetricKind, MetricSet};
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "compare", about = "Build result and percent-difference matrices from sweep metrics")]
struct Args {
    /// metrics.json written by sweep_runner
    #[arg(short, long, default_value = "results/metrics.json")]
    metrics: PathBuf,

    /// Metric to report (depth, velocity, duration, percent_time_inundated,
    /// stream_power); omit for all
    #[arg(long)]
    metric: Option<String>,

    /// Comma-separated scenario order; first entry is the baseline
    #[arg(long, value_delimiter = ',')]
    scenarios: Vec<String>,

    /// Comma-separated location (column) order
    #[arg(long, value_delimiter = ',')]
    locations: Vec<String>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// The requested order restricted to `carried`, or `carried` itself when no
/// order was given.
fn location_order(requested: &[String], carried: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return carried.to_vec();
    }
    requested.iter().filter(|l| carried.contains(l)).cloned().collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let set = MetricSet::from_file(&args.metrics)
        .with_context(|| format!("Cannot load {}", args.metrics.display()))?;

    let kinds: Vec<MetricKind> = match &args.metric {
        Some(label) => match MetricKind::from_label(label) {
            Some(kind) => vec![kind],
            None => bail!("Unknown metric {label:?}"),
        },
        None => MetricKind::ALL.to_vec(),
    };

    let mut reports = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let Some(grid) = set.grid(kind) else {
            bail!("{} has no {} grid", args.metrics.display(), kind.label());
        };
        let scenarios = if args.scenarios.is_empty() { &grid.scenarios } else { &args.scenarios };
        let locations = location_order(&args.locations, &grid.locations);
        let report = metric_report(grid, scenarios, &locations)
            .with_context(|| format!("Cannot compare {}", kind.label()))?;
        tracing::info!(metric = kind.label(), baseline = %report.matrix.rows[0], "compared");
        reports.push(report);
    }

    let json = serde_json::to_string_pretty(&reports)?;
    match &args.output {
        Some(path) => fs::write(path, json).with_context(|| format!("Write failed: {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
