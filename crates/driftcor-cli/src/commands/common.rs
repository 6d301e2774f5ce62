use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use driftcor_core::consts::{DEFAULT_CORRELATION_WINDOW, DEFAULT_REJECTION_THRESHOLD_NM};
use driftcor_core::drift::{CorrelationMethod, CorrelationPolicy, DriftTrajectory};
use driftcor_core::frame::{AxisTag, FrameStack, LengthUnit, StackMetadata, VoxelSize};
use driftcor_core::io::{load_volume, SerReader};
use driftcor_core::pipeline::{DriftConfig, PreprocessConfig};
use driftcor_core::preprocess::ClipTaperParams;
use tracing::debug;

#[derive(Clone, Copy, ValueEnum)]
pub enum UnitArg {
    Nm,
    Um,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    /// Every pair, with outlier rejection
    Rcc,
    /// Pairs within --window frames
    Mcc,
    /// Consecutive frames only
    Dcc,
}

#[derive(Args)]
pub struct InputArgs {
    /// Input stack: a SER video or a record-file volume
    pub file: PathBuf,

    /// Axis roles of a record-file volume, one letter per axis (x, y, z, t, c)
    #[arg(long, default_value = "txyz")]
    pub axes: String,

    /// Voxel size along x, y and z
    #[arg(long, value_delimiter = ',', default_values_t = [1.0, 1.0, 1.0])]
    pub voxel_size: Vec<f64>,

    /// Unit of --voxel-size
    #[arg(long, value_enum, default_value = "nm")]
    pub unit: UnitArg,
}

impl InputArgs {
    pub fn metadata(&self) -> Result<StackMetadata> {
        let [x, y, z] = self.voxel_size[..] else {
            bail!("--voxel-size takes three values, got {}", self.voxel_size.len());
        };
        let unit = match self.unit {
            UnitArg::Nm => LengthUnit::Nanometer,
            UnitArg::Um => LengthUnit::Micrometer,
        };
        Ok(StackMetadata {
            voxel: VoxelSize { x, y, z, unit },
            ..Default::default()
        })
    }

    pub fn load(&self) -> Result<FrameStack> {
        let metadata = self.metadata()?;
        let is_ser = self
            .file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ser"));
        let stack = if is_ser {
            SerReader::open(&self.file)
                .and_then(|reader| reader.read_stack(metadata))
        } else {
            AxisTag::parse_list(&self.axes)
                .and_then(|tags| load_volume(&self.file, &tags, metadata))
        };
        let stack =
            stack.with_context(|| format!("Failed to load {}", self.file.display()))?;
        debug!(
            file = %self.file.display(),
            frames = stack.len(),
            shape = ?stack.frame_shape(),
            "Loaded stack"
        );
        Ok(stack)
    }
}

#[derive(Args)]
pub struct DriftArgs {
    /// Drift configuration file (TOML); replaces the flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Correlation scheme
    #[arg(long, value_enum, default_value = "rcc")]
    pub method: MethodArg,

    /// Frame window for MCC (0 correlates every pair)
    #[arg(long, default_value_t = DEFAULT_CORRELATION_WINDOW)]
    pub window: usize,

    /// Residual in nm above which RCC discards an observation
    #[arg(long, default_value_t = DEFAULT_REJECTION_THRESHOLD_NM)]
    pub threshold: f64,

    /// Run on a worker pool
    #[arg(long)]
    pub parallel: bool,

    /// Keep frame spectra in this scratch file instead of memory
    #[arg(long)]
    pub spectra_cache: Option<PathBuf>,

    /// Median filter, clip and taper frames before estimating
    #[arg(long)]
    pub clip: bool,

    /// Mean binning before estimating, as x,y,t
    #[arg(long, value_delimiter = ',')]
    pub bin: Option<Vec<usize>>,
}

impl DriftArgs {
    pub fn to_config(&self) -> Result<DriftConfig> {
        if let Some(ref path) = self.config {
            return read_config(path);
        }

        let method = match self.method {
            MethodArg::Rcc => CorrelationMethod::Rcc,
            MethodArg::Mcc => CorrelationMethod::Mcc,
            MethodArg::Dcc => CorrelationMethod::Dcc,
        };
        let binning = match self.bin.as_deref() {
            None => None,
            Some(&[x, y, t]) => Some([x, y, t]),
            Some(other) => bail!("--bin takes three values, got {}", other.len()),
        };
        let preprocess = (self.clip || binning.is_some()).then(|| PreprocessConfig {
            filter: self.clip.then(ClipTaperParams::default),
            binning,
        });

        let mut config = DriftConfig {
            policy: CorrelationPolicy::from_method(method, self.window),
            rejection_threshold: self.threshold,
            parallel: self.parallel,
            preprocess,
            ..Default::default()
        };
        config.cache.spectra = self.spectra_cache.clone();
        Ok(config)
    }
}

pub fn read_config(path: &Path) -> Result<DriftConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).context("Invalid drift config")
}

pub fn write_trajectory(trajectory: &DriftTrajectory, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(trajectory)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write drift to {}", path.display()))
}

pub fn read_trajectory(path: &Path) -> Result<DriftTrajectory> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read drift {}", path.display()))?;
    serde_json::from_str(&contents).context("Invalid drift file")
}
