use ndarray::Array3;

use crate::drift::{DriftTrajectory, PruneReport};

/// Drift-correction stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriftStage {
    Preprocessing,
    Transforming,
    Correlating,
    Solving,
    Shifting,
}

impl std::fmt::Display for DriftStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preprocessing => write!(f, "Preprocessing frames"),
            Self::Transforming => write!(f, "Transforming frames"),
            Self::Correlating => write!(f, "Correlating frame pairs"),
            Self::Solving => write!(f, "Solving for drift"),
            Self::Shifting => write!(f, "Shifting frames"),
        }
    }
}

/// Thread-safe progress reporting for drift estimation and correction.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (frames or frame pairs), if known.
    fn begin_stage(&self, _stage: DriftStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Everything a drift estimate produced.
#[derive(Clone, Debug)]
pub struct DriftReport {
    pub trajectory: DriftTrajectory,
    /// Pairs the correlation policy scheduled.
    pub observations: usize,
    /// Observations dropped because the estimator returned no peak.
    pub discarded: usize,
    pub prune: Option<PruneReport>,
    /// Per-pair correlation slices, shape `(pairs, rows, cols)`, when requested.
    pub debug_correlation: Option<Array3<f64>>,
}
