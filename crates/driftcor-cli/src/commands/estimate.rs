use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use driftcor_core::frame::FrameStack;
use driftcor_core::io::RecordFile;
use driftcor_core::pipeline::{estimate_drift, DriftConfig, DriftReport};

use super::common::{write_trajectory, DriftArgs, InputArgs};
use crate::progress::BarReporter;
use crate::summary::{print_config_summary, print_drift_summary};

#[derive(Args)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub drift: DriftArgs,

    /// Also keep the per-pair correlation images in this record file
    #[arg(long)]
    pub debug_output: Option<PathBuf>,

    /// Output drift trajectory (JSON)
    #[arg(short, long, default_value = "drift.json")]
    pub output: PathBuf,
}

pub fn run(args: &EstimateArgs) -> Result<()> {
    let mut config = args.drift.to_config()?;
    let stack = args.input.load()?;
    print_config_summary(&config, &args.input.file, stack.len());

    let report = estimate(&stack, &mut config, args.debug_output.as_deref())?;
    write_trajectory(&report.trajectory, &args.output)?;
    print_drift_summary(&report);
    println!("Drift saved to {}", args.output.display());
    Ok(())
}

/// Run estimation with a progress bar, saving the debug volume if asked.
pub fn estimate(
    stack: &FrameStack,
    config: &mut DriftConfig,
    debug_output: Option<&Path>,
) -> Result<DriftReport> {
    let scratch = debug_output.map(|p| p.with_extension("scratch"));
    if config.cache.debug_correlation.is_none() {
        config.cache.debug_correlation = scratch;
    }

    let reporter = BarReporter::new()?;
    let report = estimate_drift(stack, config, &reporter);
    reporter.finish();
    let report = report.context("Drift estimation failed")?;

    if let (Some(path), Some(volume)) = (debug_output, report.debug_correlation.as_ref()) {
        let (pairs, rows, cols) = volume.dim();
        let mut file = RecordFile::<f64>::create(path, pairs, &[rows, cols])
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for (index, slice) in volume.outer_iter().enumerate() {
            file.write(index, slice)?;
        }
        file.flush()?;
        println!("Correlation images saved to {}", path.display());
    }
    Ok(report)
}
