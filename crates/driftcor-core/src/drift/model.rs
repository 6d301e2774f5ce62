use crate::frame::Shift;

use super::integrator::{frame_times, DriftTrajectory};

/// Drift as a continuous function of time (original frame index).
pub trait DriftModel {
    fn drift_at(&self, t: f64) -> Shift;
}

/// Piecewise-linear between samples, held constant beyond either end.
impl DriftModel for DriftTrajectory {
    fn drift_at(&self, t: f64) -> Shift {
        let n = self.time.len();
        if n == 0 {
            return [0.0; 3];
        }
        if n == 1 || t <= self.time[0] {
            return self.displacement[0];
        }
        if t >= self.time[n - 1] {
            return self.displacement[n - 1];
        }

        let upper = self.time.partition_point(|&s| s <= t).min(n - 1);
        let lower = upper - 1;
        let span = self.time[upper] - self.time[lower];
        let w = if span > 0.0 {
            (t - self.time[lower]) / span
        } else {
            0.0
        };
        let (a, b) = (self.displacement[lower], self.displacement[upper]);
        [
            a[0] + (b[0] - a[0]) * w,
            a[1] + (b[1] - a[1]) * w,
            a[2] + (b[2] - a[2]) * w,
        ]
    }
}

/// Drift for each frame of a stack of `frame_count` frames binned by `binning`.
pub fn sample_drift(model: &dyn DriftModel, frame_count: usize, binning: usize) -> Vec<Shift> {
    frame_times(frame_count, binning)
        .into_iter()
        .map(|t| model.drift_at(t))
        .collect()
}
