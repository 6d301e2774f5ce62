use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_PADDING_MULTIPLIER, DEFAULT_REJECTION_THRESHOLD_NM};
use crate::drift::CorrelationPolicy;
use crate::preprocess::ClipTaperParams;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub policy: CorrelationPolicy,
    /// Residual (nm) above which a redundant observation is discarded.
    pub rejection_threshold: f64,
    /// Run transforms, correlations and shifts on a worker pool.
    pub parallel: bool,
    pub cache: CacheConfig,
    pub shift: ShiftConfig,
    pub preprocess: Option<PreprocessConfig>,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            policy: CorrelationPolicy::default(),
            rejection_threshold: DEFAULT_REJECTION_THRESHOLD_NM,
            parallel: false,
            cache: CacheConfig::default(),
            shift: ShiftConfig::default(),
            preprocess: None,
        }
    }
}

/// Disk-backed storage for intermediate and output volumes.
///
/// `spectra` and `debug_correlation` are scratch files removed at the end of
/// the run. `shifted` is an output and is kept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub spectra: Option<PathBuf>,
    pub debug_correlation: Option<PathBuf>,
    pub shifted: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    /// Zero padding on each side, as a multiple of the frame size.
    pub padding_multiplier: usize,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            padding_multiplier: DEFAULT_PADDING_MULTIPLIER,
        }
    }
}

/// Optional conditioning applied before drift estimation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub filter: Option<ClipTaperParams>,
    /// Mean binning factors `[x, y, time]`.
    pub binning: Option<[usize; 3]>,
}
