use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::common::{write_trajectory, DriftArgs, InputArgs};
use super::estimate::estimate;
use super::shift::shift_stack;
use crate::summary::{print_config_summary, print_drift_summary};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub drift: DriftArgs,

    /// Zero padding on each side, as a multiple of the frame size
    #[arg(long)]
    pub padding: Option<usize>,

    /// Output drift trajectory (JSON)
    #[arg(long, default_value = "drift.json")]
    pub drift_output: PathBuf,

    /// Output record file for the shifted stack
    #[arg(short, long, default_value = "shifted.rec")]
    pub output: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = args.drift.to_config()?;
    if let Some(padding) = args.padding {
        config.shift.padding_multiplier = padding;
    }
    let stack = args.input.load()?;
    print_config_summary(&config, &args.input.file, stack.len());

    let report = estimate(&stack, &mut config, None)?;
    write_trajectory(&report.trajectory, &args.drift_output)?;
    print_drift_summary(&report);
    println!("Drift saved to {}", args.drift_output.display());

    shift_stack(&stack, &report.trajectory, &mut config, args.output.clone())?;
    println!("Shifted stack saved to {}", args.output.display());
    Ok(())
}
