use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use driftcor_core::pipeline::{DriftConfig, PreprocessConfig};
use driftcor_core::preprocess::ClipTaperParams;

#[derive(Args)]
pub struct ConfigArgs {
    /// Save the template here instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Emit a default `DriftConfig` with every section filled in.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = DriftConfig {
        preprocess: Some(PreprocessConfig {
            filter: Some(ClipTaperParams::default()),
            binning: Some([1, 1, 1]),
        }),
        ..Default::default()
    };
    // Cache paths stay unset: TOML has no null, so they are left out.
    let text = toml::to_string_pretty(&config).context("Failed to encode config")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Drift config written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
