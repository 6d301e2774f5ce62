use std::f64::consts::PI;

use ndarray::{s, Array3, Axis};
use num_complex::Complex;
use rustfft::FftDirection;

use crate::error::{DriftError, Result};
use crate::frame::{Frame, FrameStack, Shift, VoxelSize};
use crate::io::record::{RecordDescriptor, RecordFile};
use crate::parallel::{log_progress, Executor, Task};
use crate::pipeline::types::{DriftStage, ProgressReporter};
use crate::spectral::fft::{fft_axes, fftfreq};

/// Re-registered frames, held in memory or in a record file of shape
/// `[n][x, y, depth]`.
pub enum ShiftedVolume {
    Memory(Vec<Frame>),
    Cached(RecordFile<f32>),
}

impl ShiftedVolume {
    pub fn len(&self) -> usize {
        match self {
            ShiftedVolume::Memory(frames) => frames.len(),
            ShiftedVolume::Cached(file) => file.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy one frame out, wherever it lives.
    pub fn frame(&self, index: usize) -> Result<Frame> {
        match self {
            ShiftedVolume::Memory(frames) => frames.get(index).cloned().ok_or(
                DriftError::RecordIndexOutOfRange {
                    index,
                    total: frames.len(),
                },
            ),
            ShiftedVolume::Cached(file) => file
                .read(index)?
                .into_dimensionality()
                .map_err(|e| DriftError::InvalidRecordFile {
                    path: file.descriptor().path.clone(),
                    reason: e.to_string(),
                }),
        }
    }
}

/// Convert a physical drift (nm) into pixels for this voxel size.
pub fn drift_to_pixels(drift: &Shift, voxel: &VoxelSize) -> Shift {
    let scale = voxel.nm_per_pixel();
    [drift[0] / scale[0], drift[1] / scale[1], drift[2] / scale[2]]
}

/// Translate every x/y plane of a frame by `shift` pixels with a Fourier
/// phase ramp. Only the x and y components are applied.
///
/// Planes are zero-padded by `padding_multiplier` times their size on each
/// side so content pushed past the edge does not wrap back in.
pub fn shift_frame(frame: &Frame, shift: &Shift, padding_multiplier: usize) -> Frame {
    let (nx, ny, nz) = frame.dim();
    let (px, py) = (nx * padding_multiplier, ny * padding_multiplier);
    let (sx, sy) = (nx + 2 * px, ny + 2 * py);

    let (kx, ky) = (fftfreq(sx), fftfreq(sy));
    let ramp = Array3::from_shape_fn((sx, sy, 1), |(i, j, _)| {
        let phase = -2.0 * PI * (kx[i] * shift[0] + ky[j] * shift[1]);
        Complex::from_polar(1.0, phase)
    });
    let scale = 1.0 / (sx * sy) as f64;

    let mut result = Frame::zeros((nx, ny, nz));
    for z in 0..nz {
        let mut padded = Array3::<Complex<f64>>::zeros((sx, sy, 1));
        padded
            .slice_mut(s![px..px + nx, py..py + ny, 0])
            .zip_mut_with(&frame.index_axis(Axis(2), z), |p, &v| {
                *p = Complex::new(v as f64, 0.0)
            });

        fft_axes(&mut padded, &[0, 1], FftDirection::Forward);
        padded *= &ramp;
        fft_axes(&mut padded, &[0, 1], FftDirection::Inverse);

        result
            .index_axis_mut(Axis(2), z)
            .zip_mut_with(&padded.slice(s![px..px + nx, py..py + ny, 0]), |out, c| {
                *out = (c.norm() * scale) as f32
            });
    }
    result
}

struct ShiftJob<'a> {
    index: usize,
    frame: &'a Frame,
    shift: Shift,
}

/// Re-register a stack against its per-frame drift (physical units).
///
/// With `output`, each job writes its frame into its own slot of the record
/// file and nothing is returned to the controller.
pub fn reregister(
    stack: &FrameStack,
    drift_per_frame: &[Shift],
    voxel: &VoxelSize,
    padding_multiplier: usize,
    output: Option<RecordFile<f32>>,
    executor: &Executor,
    reporter: &dyn ProgressReporter,
) -> Result<ShiftedVolume> {
    if drift_per_frame.len() != stack.len() {
        return Err(DriftError::Config(format!(
            "{} drift samples for {} frames",
            drift_per_frame.len(),
            stack.len()
        )));
    }
    if let Some(file) = &output {
        let (nx, ny, nz) = stack.frame_shape();
        if file.len() != stack.len() || file.record_shape() != [nx, ny, nz] {
            return Err(DriftError::RecordMismatch {
                path: file.descriptor().path.clone(),
                expected: file.descriptor().element,
                expected_shape: vec![nx, ny, nz],
                found: file.descriptor().element,
                found_shape: file.record_shape().to_vec(),
            });
        }
    }

    let destination: Option<RecordDescriptor> = output.as_ref().map(|f| f.descriptor().clone());
    let tasks: Vec<Task<ShiftJob<'_>>> = stack
        .frames()
        .iter()
        .zip(drift_per_frame)
        .enumerate()
        .map(|(index, (frame, drift))| Task {
            tag: index,
            payload: ShiftJob {
                index,
                frame,
                shift: drift_to_pixels(drift, voxel),
            },
        })
        .collect();

    let total = stack.len();
    reporter.begin_stage(DriftStage::Shifting, Some(total));
    let results = executor.run(
        tasks,
        |job: ShiftJob<'_>| -> Result<Option<Frame>> {
            let shifted = shift_frame(job.frame, &job.shift, padding_multiplier);
            match &destination {
                Some(descriptor) => {
                    let mut file = RecordFile::<f32>::open(descriptor)?;
                    file.write(job.index, shifted.view())?;
                    file.flush()?;
                    Ok(None)
                }
                None => Ok(Some(shifted)),
            }
        },
        |done| {
            log_progress("shift", done, total);
            reporter.advance(done);
        },
    )?;
    reporter.finish_stage();

    match output {
        Some(file) => Ok(ShiftedVolume::Cached(file)),
        None => Ok(ShiftedVolume::Memory(
            results.into_iter().flatten().collect(),
        )),
    }
}
