use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::frame::{Shift, StackMetadata};

/// Absolute drift of every frame relative to frame 0, in nanometers, against
/// the time axis of the original (pre-binning) sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftTrajectory {
    pub time: Vec<f64>,
    pub displacement: Vec<Shift>,
}

impl DriftTrajectory {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Frame times in original frame indices for a sequence binned by `binning`
/// frames: the centre of each bin.
pub fn frame_times(frame_count: usize, binning: usize) -> Vec<f64> {
    let b = binning.max(1) as f64;
    (0..frame_count)
        .map(|k| k as f64 * b + (b - 1.0) * 0.5)
        .collect()
}

/// Sum per-step increments (pixels) into an absolute trajectory in nanometers.
pub fn integrate(increments: &Array2<f64>, metadata: &StackMetadata) -> DriftTrajectory {
    let mut cumulative = increments.clone();
    cumulative.accumulate_axis_inplace(Axis(0), |&prev, curr| *curr += prev);

    let scale = metadata.voxel.nm_per_pixel();
    let displacement = cumulative
        .rows()
        .into_iter()
        .map(|row| [row[0] * scale[0], row[1] * scale[1], row[2] * scale[2]])
        .collect();

    DriftTrajectory {
        time: frame_times(increments.nrows(), metadata.temporal_binning()),
        displacement,
    }
}
