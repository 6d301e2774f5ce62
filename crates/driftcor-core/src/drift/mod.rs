pub mod integrator;
pub mod model;
pub mod scheduler;
pub mod solver;

pub use integrator::{frame_times, integrate, DriftTrajectory};
pub use model::{sample_drift, DriftModel};
pub use scheduler::{
    column_rank, correlate_pairs, CorrelationGraph, CorrelationMethod, CorrelationPolicy,
    ShiftObservation,
};
pub use solver::{solve, DriftSolution, PruneCriterion, PruneReport};
