/// Sigma (in pixels) of the gaussian applied to both spectra before correlating.
pub const SPECTRUM_SMOOTHING_SIGMA: f64 = 0.5;

/// Axes at least this long have their outer border excluded from the peak search.
pub const BORDER_EXCLUSION_MIN_AXIS: usize = 16;

/// Fraction (in sixteenths) of an axis excluded on each side of the correlation map.
pub const BORDER_EXCLUSION_SIXTEENTHS: usize = 6;

/// Peak threshold as a fraction of the masked correlation range above its minimum.
pub const PEAK_THRESHOLD_FRACTION: f64 = 0.75;

/// Width of the isotropic structuring element used to grow the peak mask.
pub const PEAK_DILATION_WIDTH: usize = 5;

/// Shape parameter of the multiquadric kernel used for peak interpolation.
pub const MULTIQUADRIC_EPSILON: f64 = 1.0;

/// Gradient norm at which the peak optimizer stops.
pub const PEAK_GRADIENT_TOLERANCE: f64 = 1e-5;

/// Iteration cap for the peak optimizer.
pub const PEAK_MAX_ITERATIONS: usize = 200;

/// Nanometers per micrometer.
pub const NM_PER_UM: f64 = 1e3;

/// Default rejection threshold for redundant cross-correlation, in nanometers.
pub const DEFAULT_REJECTION_THRESHOLD_NM: f64 = 5.0;

/// Default correlation window (in frames) for windowed cross-correlation.
pub const DEFAULT_CORRELATION_WINDOW: usize = 5;

/// Default zero padding around each plane before a phase-ramp shift, as a
/// multiple of the plane size on each side.
pub const DEFAULT_PADDING_MULTIPLIER: usize = 1;

/// Number of progress log lines emitted per stage.
pub const PROGRESS_LOG_STEPS: usize = 5;

/// Minimum frame count to use frame-level Rayon parallelism inside a job.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Largest step (in pixels) the peak optimizer takes in one iteration.
pub const PEAK_MAX_STEP: f64 = 1.0;
