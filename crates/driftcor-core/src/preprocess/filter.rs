use std::f64::consts::PI;

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::Result;
use crate::frame::{Frame, FrameStack};
use crate::pipeline::types::{DriftStage, ProgressReporter};

/// Parameters of the clip-and-taper filter.
///
/// Values at or above `threshold_upper` become `clip_upper`, then values at or
/// below `threshold_lower` become `clip_lower`, and `clip_lower` is subtracted
/// from everything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipTaperParams {
    /// Side of the square median window; 0 disables the median filter.
    pub median_size: usize,
    pub threshold_lower: f32,
    pub clip_lower: f32,
    pub threshold_upper: f32,
    pub clip_upper: f32,
    /// Tukey shape parameter in `[0, 1]`; 0 disables the taper.
    pub tukey_alpha: f64,
}

impl Default for ClipTaperParams {
    fn default() -> Self {
        Self {
            median_size: 3,
            threshold_lower: 0.0,
            clip_lower: 0.0,
            threshold_upper: 65535.0,
            clip_upper: 0.0,
            tukey_alpha: 0.25,
        }
    }
}

/// Tukey (tapered cosine) window of `len` samples.
///
/// `alpha` 0 is rectangular, 1 is a Hann window.
pub fn tukey_window(len: usize, alpha: f64) -> Vec<f64> {
    if len <= 1 || alpha <= 0.0 {
        return vec![1.0; len];
    }
    let alpha = alpha.min(1.0);
    let m = (len - 1) as f64;
    let width = (alpha * m / 2.0).floor() as usize;
    (0..len)
        .map(|i| {
            let n = i as f64;
            if i <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * n / (alpha * m))).cos())
            } else if i + width + 1 >= len {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * n / (alpha * m))).cos())
            } else {
                1.0
            }
        })
        .collect()
}

/// Outer product of the x and y Tukey windows.
fn taper_mask(nx: usize, ny: usize, alpha: f64) -> Array2<f32> {
    let wx = tukey_window(nx, alpha);
    let wy = tukey_window(ny, alpha);
    Array2::from_shape_fn((nx, ny), |(i, j)| (wx[i] * wy[j]) as f32)
}

/// Square median filter with nearest-edge extension.
pub fn median_filter(plane: ArrayView2<'_, f32>, size: usize) -> Array2<f32> {
    if size <= 1 {
        return plane.to_owned();
    }
    let (nx, ny) = plane.dim();
    let half = (size / 2) as isize;
    let mut window = Vec::with_capacity(size * size);
    Array2::from_shape_fn((nx, ny), |(i, j)| {
        window.clear();
        for di in 0..size as isize {
            let si = (i as isize + di - half).clamp(0, nx as isize - 1) as usize;
            for dj in 0..size as isize {
                let sj = (j as isize + dj - half).clamp(0, ny as isize - 1) as usize;
                window.push(plane[[si, sj]]);
            }
        }
        let mid = window.len() / 2;
        *window.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
    })
}

fn filter_frame(frame: &Frame, params: &ClipTaperParams, mask: Option<&Array2<f32>>) -> Frame {
    let mut out = frame.clone();
    for (z, mut plane) in out.axis_iter_mut(Axis(2)).enumerate() {
        if params.median_size > 1 {
            plane.assign(&median_filter(frame.index_axis(Axis(2), z), params.median_size));
        }
        plane.mapv_inplace(|v| {
            let v = if v >= params.threshold_upper {
                params.clip_upper
            } else {
                v
            };
            let v = if v <= params.threshold_lower {
                params.clip_lower
            } else {
                v
            };
            v - params.clip_lower
        });
        if let Some(mask) = mask {
            plane *= mask;
        }
    }
    out
}

/// Median filter, clip and taper every frame of a stack.
pub fn clip_and_taper(
    stack: &FrameStack,
    params: &ClipTaperParams,
    reporter: &dyn ProgressReporter,
) -> Result<FrameStack> {
    let (nx, ny, _) = stack.frame_shape();
    let mask = (params.tukey_alpha > 0.0).then(|| taper_mask(nx, ny, params.tukey_alpha));

    reporter.begin_stage(DriftStage::Preprocessing, Some(stack.len()));
    let frames: Vec<Frame> = if stack.len() >= PARALLEL_FRAME_THRESHOLD {
        stack
            .frames()
            .par_iter()
            .map(|f| filter_frame(f, params, mask.as_ref()))
            .collect()
    } else {
        stack
            .frames()
            .iter()
            .map(|f| filter_frame(f, params, mask.as_ref()))
            .collect()
    };
    reporter.advance(frames.len());
    reporter.finish_stage();

    info!(
        frames = frames.len(),
        median = params.median_size,
        tukey = params.tukey_alpha,
        "Clipped and tapered frames"
    );
    FrameStack::new(frames, stack.metadata.clone())
}
