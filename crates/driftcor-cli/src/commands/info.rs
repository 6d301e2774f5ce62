use anyhow::Result;
use clap::Args;
use driftcor_core::frame::{AxisMap, AxisTag};

use super::common::InputArgs;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let stack = args.input.load()?;
    let (nx, ny, nz) = stack.frame_shape();
    let voxel = stack.metadata.voxel;
    let nm = voxel.nm_per_pixel();

    println!("File:        {}", args.input.file.display());
    println!("Frames:      {}", stack.len());
    println!("Frame shape: {}x{}x{}", nx, ny, nz);
    if !is_ser(&args.input) {
        let tags = AxisTag::parse_list(&args.input.axes)?;
        let map = AxisMap::from_tags(&tags)?;
        println!(
            "Axes:        x={} y={} registration={} depth={}",
            map.x,
            map.y,
            map.registration,
            map.depth.map_or("-".to_string(), |d| d.to_string())
        );
    }
    println!(
        "Voxel size:  {} x {} x {} {:?}",
        voxel.x, voxel.y, voxel.z, voxel.unit
    );
    println!("nm / pixel:  {:.3} x {:.3} x {:.3}", nm[0], nm[1], nm[2]);

    let total_mb = (nx * ny * nz * stack.len() * 4) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}

fn is_ser(input: &InputArgs) -> bool {
    input
        .file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ser"))
}
