pub mod config;
mod orchestrator;
pub mod types;

pub use config::{CacheConfig, DriftConfig, PreprocessConfig, ShiftConfig};
pub use orchestrator::{correct_drift, estimate_drift, preprocess};
pub use types::{DriftReport, DriftStage, NoOpReporter, ProgressReporter};
