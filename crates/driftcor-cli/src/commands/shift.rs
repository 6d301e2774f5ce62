use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use driftcor_core::consts::DEFAULT_PADDING_MULTIPLIER;
use driftcor_core::drift::{sample_drift, DriftTrajectory};
use driftcor_core::frame::FrameStack;
use driftcor_core::pipeline::{correct_drift, DriftConfig};

use super::common::{read_trajectory, InputArgs};
use crate::progress::BarReporter;

#[derive(Args)]
pub struct ShiftArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Drift trajectory (JSON) written by `estimate`
    #[arg(long)]
    pub drift: PathBuf,

    /// Zero padding on each side, as a multiple of the frame size
    #[arg(long, default_value_t = DEFAULT_PADDING_MULTIPLIER)]
    pub padding: usize,

    /// Run on a worker pool
    #[arg(long)]
    pub parallel: bool,

    /// Output record file (reload with --axes txyz)
    #[arg(short, long, default_value = "shifted.rec")]
    pub output: PathBuf,
}

pub fn run(args: &ShiftArgs) -> Result<()> {
    let stack = args.input.load()?;
    let trajectory = read_trajectory(&args.drift)?;

    let mut config = DriftConfig {
        parallel: args.parallel,
        ..Default::default()
    };
    config.shift.padding_multiplier = args.padding;

    shift_stack(&stack, &trajectory, &mut config, args.output.clone())?;
    println!("Shifted stack saved to {}", args.output.display());
    Ok(())
}

/// Interpolate `trajectory` onto every frame and write the shifted stack.
pub fn shift_stack(
    stack: &FrameStack,
    trajectory: &DriftTrajectory,
    config: &mut DriftConfig,
    output: PathBuf,
) -> Result<()> {
    let drift = sample_drift(trajectory, stack.len(), stack.metadata.temporal_binning());
    config.cache.shifted = Some(output);

    let reporter = BarReporter::new()?;
    let shifted = correct_drift(stack, &drift, config, &reporter);
    reporter.finish();
    let shifted = shifted.context("Drift correction failed")?;
    println!("Shifted {} frames", shifted.len());
    Ok(())
}
