use ndarray::{s, Array3, Axis};
use rayon::prelude::*;
use tracing::info;

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{DriftError, Result};
use crate::frame::{Frame, FrameStack, StackMetadata};
use crate::pipeline::types::{DriftStage, ProgressReporter};

/// Mean of one group of frames, binned `bx` by `by` in x and y.
fn bin_group(group: &[Frame], bx: usize, by: usize) -> Frame {
    let (nx, ny, nz) = group[0].dim();
    let (ox, oy) = (nx / bx, ny / by);
    let mut out = Array3::<f32>::zeros((ox, oy, nz));
    for frame in group {
        for ((i, j, z), v) in out.indexed_iter_mut() {
            *v += frame
                .slice(s![i * bx..(i + 1) * bx, j * by..(j + 1) * by, z])
                .sum();
        }
    }
    let count = (group.len() * bx * by) as f32;
    out /= count;
    out
}

/// Downsample a stack by the mean over `[bx, by, bt]` blocks.
///
/// Trailing x/y pixels that do not fill a block are dropped. The last time bin
/// may hold fewer than `bt` frames and is averaged over what it has.
pub fn bin_stack(
    stack: &FrameStack,
    bin: [usize; 3],
    reporter: &dyn ProgressReporter,
) -> Result<FrameStack> {
    let [bx, by, bt] = bin;
    let (nx, ny, _) = stack.frame_shape();
    if bin.contains(&0) {
        return Err(DriftError::Config(format!("bin sizes must be positive, got {bin:?}")));
    }
    if bx > nx || by > ny {
        return Err(DriftError::Config(format!(
            "bin {bx}x{by} larger than frame {nx}x{ny}"
        )));
    }

    let groups: Vec<&[Frame]> = stack.frames().chunks(bt).collect();
    reporter.begin_stage(DriftStage::Preprocessing, Some(groups.len()));
    let frames: Vec<Frame> = if groups.len() >= PARALLEL_FRAME_THRESHOLD {
        groups.par_iter().map(|g| bin_group(g, bx, by)).collect()
    } else {
        groups.iter().map(|g| bin_group(g, bx, by)).collect()
    };
    reporter.advance(frames.len());
    reporter.finish_stage();

    let mut metadata: StackMetadata = stack.metadata.clone();
    metadata.voxel.x *= bx as f64;
    metadata.voxel.y *= by as f64;
    for (total, b) in metadata.binning.iter_mut().zip(bin) {
        *total *= b;
    }

    info!(
        frames_in = stack.len(),
        frames_out = frames.len(),
        ?bin,
        "Binned stack"
    );
    FrameStack::new(frames, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::NoOpReporter;

    fn ramp_stack(n: usize) -> FrameStack {
        let frames = (0..n)
            .map(|t| Array3::from_shape_fn((5, 4, 1), |(x, y, _)| (x + 10 * y + 100 * t) as f32))
            .collect();
        FrameStack::new(frames, StackMetadata::default()).unwrap()
    }

    #[test]
    fn test_partial_time_bin_and_dropped_remainder() {
        let binned = bin_stack(&ramp_stack(5), [2, 2, 2], &NoOpReporter).unwrap();
        assert_eq!(binned.len(), 3);
        assert_eq!(binned.frame_shape(), (2, 2, 1));
        // x in {0,1}, y in {0,1}, t in {0,1}
        assert_eq!(binned.frame(0)[[0, 0, 0]], 0.5 + 5.0 + 50.0);
        // last bin holds t = 4 only
        assert_eq!(binned.frame(2)[[1, 1, 0]], 2.5 + 25.0 + 400.0);
        assert_eq!(binned.metadata.binning, [2, 2, 2]);
        assert_eq!(binned.metadata.voxel.x, 2.0);
    }

    #[test]
    fn test_zero_bin_rejected() {
        assert!(bin_stack(&ramp_stack(2), [1, 0, 1], &NoOpReporter).is_err());
    }
}
