use nalgebra::DMatrix;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DriftError, Result};

use super::scheduler::{column_rank, CorrelationGraph, CorrelationPolicy};

/// When an observation counts as an outlier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PruneCriterion {
    /// Residual magnitude, in physical units, above which a row is a candidate.
    pub threshold: f64,
    /// Physical size of one pixel along (x, y, depth).
    pub axis_scale: [f64; 3],
}

/// Outcome of outlier rejection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Rows whose residual exceeded the threshold.
    pub candidates: usize,
    pub removed: usize,
    /// Candidates kept because removing them would lose rank.
    pub retained: usize,
}

#[derive(Clone, Debug)]
pub struct DriftSolution {
    /// Frame-to-frame increments in pixels, shape `(n, 3)`; row 0 is zero.
    pub increments: Array2<f64>,
    pub prune: Option<PruneReport>,
}

/// Least-squares increments for the system `coefficients * x = observations`.
pub fn least_squares(
    coefficients: &DMatrix<f64>,
    observations: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let (rows, cols) = coefficients.shape();
    if cols == 0 {
        return Ok(DMatrix::zeros(0, observations.ncols()));
    }
    let svd = coefficients.clone().svd(true, true);
    let eps = svd.singular_values.max() * rows.max(cols) as f64 * f64::EPSILON;
    svd.solve(observations, eps)
        .map_err(|e| DriftError::Config(format!("Least-squares solve failed: {e}")))
}

/// Magnitude of each row's residual, scaled to physical units.
pub fn residual_norms(
    coefficients: &DMatrix<f64>,
    observations: &DMatrix<f64>,
    increments: &DMatrix<f64>,
    axis_scale: &[f64; 3],
) -> Vec<f64> {
    let residuals = coefficients * increments - observations;
    residuals
        .row_iter()
        .map(|row| {
            row.iter()
                .zip(axis_scale)
                .map(|(r, s)| (r * s) * (r * s))
                .sum::<f64>()
                .sqrt()
        })
        .collect()
}

/// Greedily zero the rows of high-residual observations while the matrix
/// keeps full column rank.
///
/// Rows are visited once, in descending residual order (ties in original
/// order). A removal that would lose rank is undone and never retried. Each
/// visit costs one rank computation, cubic in the number of unknowns.
pub fn prune_outliers(
    coefficients: &mut DMatrix<f64>,
    norms: &[f64],
    threshold: f64,
) -> PruneReport {
    let unknowns = coefficients.ncols();
    let mut order: Vec<usize> = (0..norms.len()).collect();
    order.sort_by(|&a, &b| norms[b].total_cmp(&norms[a]));

    let mut report = PruneReport::default();
    for row in order.into_iter().filter(|&r| norms[r] > threshold) {
        report.candidates += 1;
        let saved = coefficients.row(row).clone_owned();
        coefficients.row_mut(row).fill(0.0);
        if column_rank(coefficients) == unknowns {
            report.removed += 1;
        } else {
            coefficients.row_mut(row).copy_from(&saved);
            report.retained += 1;
        }
    }
    report
}

/// Solve the graph for per-frame increments, pruning outliers when the policy
/// allows it.
pub fn solve(
    graph: &CorrelationGraph,
    policy: CorrelationPolicy,
    criterion: &PruneCriterion,
) -> Result<DriftSolution> {
    let mut increments = least_squares(&graph.coefficients, &graph.observations)?;
    info!(rows = graph.len(), unknowns = graph.unknowns(), "Solved drift system");

    let prune = if policy.prunes_outliers() && graph.unknowns() > 0 {
        let norms = residual_norms(
            &graph.coefficients,
            &graph.observations,
            &increments,
            &criterion.axis_scale,
        );
        let mut coefficients = graph.coefficients.clone();
        let report = prune_outliers(&mut coefficients, &norms, criterion.threshold);
        info!(removed = report.removed, "Outlier rejection complete");
        if report.retained > 0 {
            warn!(
                retained = report.retained,
                threshold = criterion.threshold,
                "Could not remove all observations over the rejection threshold"
            );
        }
        increments = least_squares(&coefficients, &graph.observations)?;
        Some(report)
    } else {
        None
    };

    let n = graph.frame_count;
    let mut padded = Array2::<f64>::zeros((n, 3));
    for step in 0..graph.unknowns() {
        for axis in 0..3 {
            padded[[step + 1, axis]] = increments[(step, axis)];
        }
    }

    Ok(DriftSolution {
        increments: padded,
        prune,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_never_drops_rank() {
        // Chain of three unknowns with one redundant row: only the redundant
        // row (or one of its partners) can go.
        let mut coefficients = DMatrix::from_row_slice(
            4,
            3,
            &[
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
                1.0, 1.0, 1.0, //
            ],
        );
        let norms = [10.0, 9.0, 8.0, 7.0];
        let report = prune_outliers(&mut coefficients, &norms, 1.0);
        assert_eq!(report.candidates, 4);
        assert_eq!(report.removed, 1);
        assert_eq!(report.retained, 3);
        assert_eq!(column_rank(&coefficients), 3);
        // Largest residual goes first.
        assert!(coefficients.row(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_prune_ignores_rows_under_threshold() {
        let mut coefficients = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 1.0]);
        let report = prune_outliers(&mut coefficients, &[0.5, 3.0, 0.1], 1.0);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(coefficients[(1, 0)], 0.0);
        assert_eq!(coefficients[(0, 0)], 1.0);
    }
}
