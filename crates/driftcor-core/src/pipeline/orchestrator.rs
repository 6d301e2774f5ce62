use std::borrow::Cow;

use ndarray::Ix3;
use num_complex::Complex;
use tracing::info;

use crate::align::estimator::debug_slice_shape;
use crate::align::shifter::{reregister, ShiftedVolume};
use crate::drift::{
    correlate_pairs, integrate, solve, CorrelationGraph, PruneCriterion,
};
use crate::error::{DriftError, Result};
use crate::frame::{FrameStack, Shift};
use crate::io::record::RecordFile;
use crate::io::session::CacheSession;
use crate::parallel::Executor;
use crate::preprocess::{bin_stack, clip_and_taper};
use crate::spectral::compute_spectra;
use crate::spectral::transform::spectrum_cache_shape;

use super::config::{DriftConfig, PreprocessConfig};
use super::types::{DriftReport, DriftStage, ProgressReporter};

/// Apply the configured filter and binning, in that order.
pub fn preprocess(
    stack: &FrameStack,
    config: &PreprocessConfig,
    reporter: &dyn ProgressReporter,
) -> Result<FrameStack> {
    let mut prepared = match &config.filter {
        Some(params) => clip_and_taper(stack, params, reporter)?,
        None => stack.clone(),
    };
    if let Some(bin) = config.binning {
        prepared = bin_stack(&prepared, bin, reporter)?;
    }
    Ok(prepared)
}

/// Estimate the drift of every frame relative to frame 0.
///
/// Scratch caches named in `config.cache` live only for the duration of this
/// call and are removed on every exit path.
pub fn estimate_drift(
    stack: &FrameStack,
    config: &DriftConfig,
    reporter: &dyn ProgressReporter,
) -> Result<DriftReport> {
    // Declared first so it outlives every cache handle below.
    let mut session = CacheSession::new();

    let stack: Cow<'_, FrameStack> = match &config.preprocess {
        Some(pre) => Cow::Owned(preprocess(stack, pre, reporter)?),
        None => Cow::Borrowed(stack),
    };
    let n = stack.len();
    let policy = config.policy;

    let executor = Executor::new(config.parallel)?;
    info!(
        frames = n,
        shape = ?stack.frame_shape(),
        ?policy,
        workers = executor.workers(),
        "Estimating drift"
    );

    let spectra_cache = match &config.cache.spectra {
        Some(path) => {
            let (_, shape) = spectrum_cache_shape(&stack);
            Some(session.create::<Complex<f64>>("spectra", path, n, &shape)?)
        }
        None => None,
    };
    let store = compute_spectra(&stack, &executor, spectra_cache, reporter)?;

    let observation_count = policy.observation_count(n);
    let debug_cache = match &config.cache.debug_correlation {
        Some(path) => {
            let slice = debug_slice_shape(store.layout());
            Some(session.create::<f64>("debug_correlation", path, observation_count, &slice)?)
        }
        None => None,
    };

    let observations = correlate_pairs(&store, policy, &executor, debug_cache.as_ref(), reporter)?;

    reporter.begin_stage(DriftStage::Solving, None);
    let graph = CorrelationGraph::assemble(n, &observations)?;
    let criterion = PruneCriterion {
        threshold: config.rejection_threshold,
        axis_scale: stack.metadata.voxel.nm_per_pixel(),
    };
    let solution = solve(&graph, policy, &criterion)?;
    let trajectory = integrate(&solution.increments, &stack.metadata);
    reporter.finish_stage();

    let debug_correlation = match &debug_cache {
        Some(file) => Some(file.read_all()?.into_dimensionality::<Ix3>().map_err(|e| {
            DriftError::InvalidRecordFile {
                path: file.descriptor().path.clone(),
                reason: e.to_string(),
            }
        })?),
        None => None,
    };

    info!(
        frames = n,
        observations = observations.len(),
        discarded = graph.discarded,
        "Drift estimation complete"
    );

    Ok(DriftReport {
        trajectory,
        observations: observations.len(),
        discarded: graph.discarded,
        prune: solution.prune,
        debug_correlation,
    })
}

/// Re-register `stack` by its per-frame drift in nanometers.
///
/// With `config.cache.shifted` set, frames are written to that record file,
/// which is kept after the call.
pub fn correct_drift(
    stack: &FrameStack,
    drift_per_frame: &[Shift],
    config: &DriftConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ShiftedVolume> {
    let executor = Executor::new(config.parallel)?;
    let output = match &config.cache.shifted {
        Some(path) => {
            let (nx, ny, nz) = stack.frame_shape();
            Some(RecordFile::<f32>::create(path, stack.len(), &[nx, ny, nz])?)
        }
        None => None,
    };
    info!(
        frames = stack.len(),
        padding = config.shift.padding_multiplier,
        workers = executor.workers(),
        "Correcting drift"
    );
    reregister(
        stack,
        drift_per_frame,
        &stack.metadata.voxel,
        config.shift.padding_multiplier,
        output,
        &executor,
        reporter,
    )
}
