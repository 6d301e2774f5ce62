use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::align::estimator::{estimate_shift, estimate_shift_with_debug};
use crate::error::{DriftError, Result};
use crate::frame::{is_valid_shift, Shift};
use crate::io::record::{RecordDescriptor, RecordFile};
use crate::parallel::{log_progress, Executor, Task};
use crate::pipeline::types::{DriftStage, ProgressReporter};
use crate::spectral::{SpectralStore, SpectrumSource};

/// Conventional names of the three correlation schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    /// Redundant cross-correlation: every pair, with outlier rejection.
    Rcc,
    /// Windowed cross-correlation: pairs within a bounded frame distance.
    Mcc,
    /// Direct cross-correlation: consecutive frames only.
    Dcc,
}

/// Which frame pairs get correlated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationPolicy {
    Direct,
    Windowed { window: usize },
    #[default]
    Redundant,
}

impl CorrelationPolicy {
    pub fn from_method(method: CorrelationMethod, window: usize) -> Self {
        match method {
            CorrelationMethod::Dcc => CorrelationPolicy::Direct,
            CorrelationMethod::Rcc => CorrelationPolicy::Redundant,
            CorrelationMethod::Mcc if window > 0 => CorrelationPolicy::Windowed { window },
            CorrelationMethod::Mcc => CorrelationPolicy::Redundant,
        }
    }

    /// Only the redundant scheme has enough spare rows to drop outliers.
    pub fn prunes_outliers(&self) -> bool {
        matches!(self, CorrelationPolicy::Redundant)
    }

    /// Candidate pairs `(i, j)`, `i < j`, in anchor-major order.
    pub fn pairs(&self, frame_count: usize) -> Vec<(usize, usize)> {
        let max_gap = match *self {
            CorrelationPolicy::Direct => 1,
            CorrelationPolicy::Windowed { window } if window > 0 => window,
            CorrelationPolicy::Windowed { .. } | CorrelationPolicy::Redundant => usize::MAX,
        };
        let mut pairs = Vec::with_capacity(self.observation_count(frame_count));
        for i in 0..frame_count.saturating_sub(1) {
            for j in i + 1..frame_count {
                if j - i > max_gap {
                    break;
                }
                pairs.push((i, j));
            }
        }
        pairs
    }

    pub fn observation_count(&self, frame_count: usize) -> usize {
        let n = frame_count;
        match *self {
            CorrelationPolicy::Direct => n.saturating_sub(1),
            CorrelationPolicy::Windowed { window } if window > 0 && window < n => {
                n * window - window * (window + 1) / 2
            }
            _ => n * n.saturating_sub(1) / 2,
        }
    }
}

/// Measured displacement of frame `anchor` relative to frame `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShiftObservation {
    pub anchor: usize,
    pub target: usize,
    pub shift: Shift,
}

impl ShiftObservation {
    pub fn is_valid(&self) -> bool {
        is_valid_shift(&self.shift)
    }
}

/// Linear system relating pairwise observations to per-step drift increments.
///
/// Column `k` is the increment from frame `k` to `k + 1`; the row of pair
/// `(i, j)` has ones in columns `i..j`.
#[derive(Clone, Debug)]
pub struct CorrelationGraph {
    pub frame_count: usize,
    pub pairs: Vec<(usize, usize)>,
    pub coefficients: DMatrix<f64>,
    pub observations: DMatrix<f64>,
    /// Observations dropped because no confident peak was found.
    pub discarded: usize,
}

impl CorrelationGraph {
    /// Build the system from raw observations, dropping invalid ones.
    ///
    /// Fails unless the remaining rows determine all `n - 1` increments.
    pub fn assemble(frame_count: usize, measured: &[ShiftObservation]) -> Result<Self> {
        if frame_count == 0 {
            return Err(DriftError::EmptySequence);
        }
        let unknowns = frame_count - 1;
        if let Some(bad) = measured
            .iter()
            .find(|o| o.anchor >= o.target || o.target >= frame_count)
        {
            return Err(DriftError::Config(format!(
                "Invalid frame pair ({}, {}) for {} frames",
                bad.anchor, bad.target, frame_count
            )));
        }

        let valid: Vec<&ShiftObservation> = measured.iter().filter(|o| o.is_valid()).collect();
        let discarded = measured.len() - valid.len();
        if discarded > 0 {
            info!(
                discarded,
                total = measured.len(),
                "Removed cross correlations without a confident peak"
            );
        }

        let rows = valid.len();
        let mut coefficients = DMatrix::<f64>::zeros(rows, unknowns);
        let mut observations = DMatrix::<f64>::zeros(rows, 3);
        for (row, obs) in valid.iter().enumerate() {
            for col in obs.anchor..obs.target {
                coefficients[(row, col)] = 1.0;
            }
            for axis in 0..3 {
                observations[(row, axis)] = obs.shift[axis];
            }
        }

        let achieved = column_rank(&coefficients);
        if achieved != unknowns {
            return Err(DriftError::RankDeficient {
                achieved,
                required: unknowns,
            });
        }

        Ok(Self {
            frame_count,
            pairs: valid.iter().map(|o| (o.anchor, o.target)).collect(),
            coefficients,
            observations,
            discarded,
        })
    }

    pub fn unknowns(&self) -> usize {
        self.frame_count - 1
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Numerical rank with the usual SVD tolerance `s_max * max(m, n) * eps`.
///
/// Cost is one SVD, cubic in the smaller dimension.
pub fn column_rank(matrix: &DMatrix<f64>) -> usize {
    let (rows, cols) = matrix.shape();
    if rows == 0 || cols == 0 {
        return 0;
    }
    let singular = matrix.clone().svd(false, false).singular_values;
    let tolerance = singular.max() * rows.max(cols) as f64 * f64::EPSILON;
    singular.iter().filter(|&&s| s > tolerance).count()
}

struct PairJob {
    slot: usize,
    anchor: SpectrumSource,
    target: SpectrumSource,
    origin: Shift,
    debug: Option<RecordDescriptor>,
}

/// Correlate every pair the policy asks for.
///
/// Each anchor is first correlated with itself; that self-correlation peak is
/// subtracted from the anchor's pairs to cancel the centring bias. Results are
/// ordered like `policy.pairs(n)`.
pub fn correlate_pairs(
    store: &SpectralStore,
    policy: CorrelationPolicy,
    executor: &Executor,
    debug: Option<&RecordFile<f64>>,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<ShiftObservation>> {
    let n = store.len();
    let pairs = policy.pairs(n);
    let mut anchors: Vec<usize> = pairs.iter().map(|&(i, _)| i).collect();
    anchors.dedup();

    let anchor_tasks: Vec<Task<SpectrumSource>> = anchors
        .iter()
        .enumerate()
        .map(|(tag, &i)| Task {
            tag,
            payload: store.source(i),
        })
        .collect();
    let origins = executor.run(
        anchor_tasks,
        |source: SpectrumSource| -> Result<Shift> {
            let ft = source.load()?;
            Ok(estimate_shift(&ft, &ft, &[0.0; 3]))
        },
        |_| {},
    )?;
    let mut origin_of = vec![[0.0; 3]; n];
    for (&i, origin) in anchors.iter().zip(origins) {
        origin_of[i] = origin;
    }

    let debug_descriptor = debug.map(|d| d.descriptor().clone());
    let tasks: Vec<Task<PairJob>> = pairs
        .iter()
        .enumerate()
        .map(|(slot, &(i, j))| Task {
            tag: slot,
            payload: PairJob {
                slot,
                anchor: store.source(i),
                target: store.source(j),
                origin: origin_of[i],
                debug: debug_descriptor.clone(),
            },
        })
        .collect();

    let total = tasks.len();
    reporter.begin_stage(DriftStage::Correlating, Some(total));
    let shifts = executor.run(
        tasks,
        |job: PairJob| -> Result<Shift> {
            let a = job.anchor.load()?;
            let b = job.target.load()?;
            match &job.debug {
                Some(descriptor) => {
                    let mut file = RecordFile::<f64>::open(descriptor)?;
                    estimate_shift_with_debug(&a, &b, &job.origin, &mut file, job.slot)
                }
                None => Ok(estimate_shift(&a, &b, &job.origin)),
            }
        },
        |done| {
            log_progress("correlate", done, total);
            reporter.advance(done);
        },
    )?;
    reporter.finish_stage();

    Ok(pairs
        .into_iter()
        .zip(shifts)
        .map(|((anchor, target), shift)| ShiftObservation {
            anchor,
            target,
            shift,
        })
        .collect())
}
