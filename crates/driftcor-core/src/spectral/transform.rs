use std::sync::Arc;

use ndarray::{Array3, Ix3};
use num_complex::Complex;

use crate::error::{DriftError, Result};
use crate::frame::{Frame, FrameStack, Shift};
use crate::io::record::{RecordDescriptor, RecordFile};
use crate::parallel::{log_progress, Executor, Task};
use crate::pipeline::types::{DriftStage, ProgressReporter};

use super::fft::rfft3;

/// Axis order used in frequency space: the longest frame axis is moved last so
/// the real transform halves the largest dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpectralLayout {
    /// `order[i]` is the frame axis placed at layout position `i`.
    order: [usize; 3],
    /// Real-space shape in layout order.
    real_shape: [usize; 3],
}

impl SpectralLayout {
    pub fn for_frame_shape(shape: (usize, usize, usize)) -> Self {
        let dims = [shape.0, shape.1, shape.2];
        let mut longest = 0;
        for (axis, &len) in dims.iter().enumerate() {
            if len > dims[longest] {
                longest = axis;
            }
        }
        let mut order = [0, 1, 2];
        order.swap(longest, 2);
        Self {
            order,
            real_shape: [dims[order[0]], dims[order[1]], dims[order[2]]],
        }
    }

    pub fn real_shape(&self) -> [usize; 3] {
        self.real_shape
    }

    /// Shape of the half spectrum stored for each frame.
    pub fn spectrum_shape(&self) -> [usize; 3] {
        [
            self.real_shape[0],
            self.real_shape[1],
            self.real_shape[2] / 2 + 1,
        ]
    }

    /// Reorder a frame-space vector into layout order.
    pub fn to_layout(&self, shift: &Shift) -> Shift {
        [shift[self.order[0]], shift[self.order[1]], shift[self.order[2]]]
    }

    /// Reorder a layout-space vector back into frame order (x, y, depth).
    pub fn to_frame(&self, shift: &Shift) -> Shift {
        let mut out = [0.0; 3];
        for (pos, &axis) in self.order.iter().enumerate() {
            out[axis] = shift[pos];
        }
        out
    }

    fn arrange(&self, frame: &Frame) -> Array3<f64> {
        frame
            .view()
            .permuted_axes(self.order)
            .mapv(|v| v as f64)
    }
}

/// Half spectrum of one frame, in layout order.
#[derive(Clone, Debug)]
pub struct FrequencyFrame {
    pub spectrum: Array3<Complex<f64>>,
    pub layout: SpectralLayout,
}

impl FrequencyFrame {
    /// Real length of the last layout axis.
    pub fn real_len(&self) -> usize {
        self.layout.real_shape[2]
    }
}

/// Transform one frame to its half spectrum.
pub fn transform(frame: &Frame, layout: &SpectralLayout) -> FrequencyFrame {
    FrequencyFrame {
        spectrum: rfft3(&layout.arrange(frame)),
        layout: *layout,
    }
}

/// Transform one frame and write the spectrum straight into slot `index` of a cache.
pub fn transform_into_cache(
    frame: &Frame,
    layout: &SpectralLayout,
    cache: &mut RecordFile<Complex<f64>>,
    index: usize,
) -> Result<()> {
    let ft = transform(frame, layout);
    cache.write(index, ft.spectrum.view())?;
    cache.flush()
}

/// Where one frame's spectrum can be found, in a form a worker can carry.
#[derive(Clone, Debug)]
pub enum SpectrumSource {
    Memory(Arc<FrequencyFrame>),
    Cached {
        descriptor: RecordDescriptor,
        index: usize,
        layout: SpectralLayout,
    },
}

impl SpectrumSource {
    pub fn load(&self) -> Result<Arc<FrequencyFrame>> {
        match self {
            SpectrumSource::Memory(ft) => Ok(Arc::clone(ft)),
            SpectrumSource::Cached {
                descriptor,
                index,
                layout,
            } => {
                let cache = RecordFile::<Complex<f64>>::open(descriptor)?;
                let spectrum = cache
                    .read(*index)?
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| DriftError::InvalidRecordFile {
                        path: descriptor.path.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(Arc::new(FrequencyFrame {
                    spectrum,
                    layout: *layout,
                }))
            }
        }
    }
}

/// Spectra of every frame in a run, held in memory or in a disk cache.
pub enum SpectralStore {
    Memory {
        layout: SpectralLayout,
        spectra: Vec<Arc<FrequencyFrame>>,
    },
    Cached {
        layout: SpectralLayout,
        cache: RecordFile<Complex<f64>>,
    },
}

impl SpectralStore {
    pub fn layout(&self) -> &SpectralLayout {
        match self {
            SpectralStore::Memory { layout, .. } | SpectralStore::Cached { layout, .. } => layout,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SpectralStore::Memory { spectra, .. } => spectra.len(),
            SpectralStore::Cached { cache, .. } => cache.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source(&self, index: usize) -> SpectrumSource {
        match self {
            SpectralStore::Memory { spectra, .. } => SpectrumSource::Memory(Arc::clone(&spectra[index])),
            SpectralStore::Cached { layout, cache } => SpectrumSource::Cached {
                descriptor: cache.descriptor().clone(),
                index,
                layout: *layout,
            },
        }
    }
}

/// Spectrum cache shape for a stack: `count` records of the half-spectrum shape.
pub fn spectrum_cache_shape(stack: &FrameStack) -> (SpectralLayout, Vec<usize>) {
    let layout = SpectralLayout::for_frame_shape(stack.frame_shape());
    (layout, layout.spectrum_shape().to_vec())
}

struct TransformJob<'a> {
    index: usize,
    frame: &'a Frame,
}

/// Transform every frame of the stack, one job per frame.
///
/// With a cache, each job writes its own slot and no spectrum is returned to
/// the controller, so peak memory stays at one spectrum per worker.
pub fn compute_spectra(
    stack: &FrameStack,
    executor: &Executor,
    cache: Option<RecordFile<Complex<f64>>>,
    reporter: &dyn ProgressReporter,
) -> Result<SpectralStore> {
    let layout = SpectralLayout::for_frame_shape(stack.frame_shape());
    let total = stack.len();
    let destination = cache.as_ref().map(|c| c.descriptor().clone());

    let tasks: Vec<Task<TransformJob<'_>>> = stack
        .frames()
        .iter()
        .enumerate()
        .map(|(index, frame)| Task {
            tag: index,
            payload: TransformJob { index, frame },
        })
        .collect();

    let job = |job: TransformJob<'_>| -> Result<Option<FrequencyFrame>> {
        match &destination {
            Some(descriptor) => {
                let mut cache = RecordFile::<Complex<f64>>::open(descriptor)?;
                transform_into_cache(job.frame, &layout, &mut cache, job.index)?;
                Ok(None)
            }
            None => Ok(Some(transform(job.frame, &layout))),
        }
    };

    reporter.begin_stage(DriftStage::Transforming, Some(total));
    let results = executor.run(tasks, job, |done| {
        log_progress("transform", done, total);
        reporter.advance(done);
    })?;
    reporter.finish_stage();

    match cache {
        Some(cache) => Ok(SpectralStore::Cached { layout, cache }),
        None => {
            let spectra = results
                .into_iter()
                .enumerate()
                .map(|(i, ft)| {
                    ft.map(Arc::new).ok_or_else(|| {
                        DriftError::Pool(format!("transform job {i} returned no spectrum"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(SpectralStore::Memory { layout, spectra })
        }
    }
}
