use std::path::PathBuf;

use thiserror::Error;

use crate::io::record::ElementType;

#[derive(Error, Debug)]
pub enum DriftError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported dimensionality: {ndim}D input (expected 3 or 4 axes)")]
    UnsupportedDimensions { ndim: usize },

    #[error("Cannot choose a registration axis: no T or Z axis among {tags}")]
    AmbiguousRegistrationAxis { tags: String },

    #[error("Record file {path} holds {found:?} records of shape {found_shape:?}, expected {expected:?} of shape {expected_shape:?}")]
    RecordMismatch {
        path: PathBuf,
        expected: ElementType,
        expected_shape: Vec<usize>,
        found: ElementType,
        found_shape: Vec<usize>,
    },

    #[error("Invalid record file {path}: {reason}")]
    InvalidRecordFile { path: PathBuf, reason: String },

    #[error("Record index {index} out of range (total: {total})")]
    RecordIndexOutOfRange { index: usize, total: usize },

    #[error("Insufficient valid observations to determine drift uniquely: rank {achieved}, required {required}")]
    RankDeficient { achieved: usize, required: usize },

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Worker pool error: {0}")]
    Pool(String),
}

pub type Result<T> = std::result::Result<T, DriftError>;
