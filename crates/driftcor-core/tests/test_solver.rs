use approx::assert_abs_diff_eq;

use driftcor_core::drift::{
    column_rank, solve, CorrelationGraph, CorrelationPolicy, PruneCriterion, ShiftObservation,
};

fn criterion(threshold: f64) -> PruneCriterion {
    PruneCriterion {
        threshold,
        axis_scale: [1.0, 1.0, 1.0],
    }
}

/// Observations of a drift with per-frame increments `steps`.
fn exact(policy: CorrelationPolicy, steps: &[[f64; 3]]) -> Vec<ShiftObservation> {
    let n = steps.len() + 1;
    policy
        .pairs(n)
        .into_iter()
        .map(|(i, j)| {
            let mut shift = [0.0; 3];
            for step in &steps[i..j] {
                for axis in 0..3 {
                    shift[axis] += step[axis];
                }
            }
            ShiftObservation {
                anchor: i,
                target: j,
                shift,
            }
        })
        .collect()
}

#[test]
fn test_every_policy_returns_n_rows_with_zero_first() {
    let steps = [[1.0, -0.5, 0.0], [0.5, 0.25, 0.0], [-1.0, 2.0, 0.0], [0.0, 0.0, 0.0]];
    for policy in [
        CorrelationPolicy::Direct,
        CorrelationPolicy::Windowed { window: 2 },
        CorrelationPolicy::Redundant,
    ] {
        let graph = CorrelationGraph::assemble(5, &exact(policy, &steps)).unwrap();
        assert_eq!(graph.unknowns(), 4);
        let solution = solve(&graph, policy, &criterion(5.0)).unwrap();
        assert_eq!(solution.increments.dim(), (5, 3));
        assert!(solution.increments.row(0).iter().all(|&v| v == 0.0));
        for (k, step) in steps.iter().enumerate() {
            for axis in 0..3 {
                assert_abs_diff_eq!(solution.increments[[k + 1, axis]], step[axis], epsilon = 1e-9);
            }
        }
        assert_eq!(solution.prune.is_some(), policy == CorrelationPolicy::Redundant);
    }
}

#[test]
fn test_redundant_pruning_removes_outlier() {
    let steps = [[1.0, 0.0, 0.0]; 5];
    let mut obs = exact(CorrelationPolicy::Redundant, &steps);
    let bad = obs.iter().position(|o| (o.anchor, o.target) == (1, 4)).unwrap();
    obs[bad].shift[0] += 40.0;

    let graph = CorrelationGraph::assemble(6, &obs).unwrap();
    let solution = solve(&graph, CorrelationPolicy::Redundant, &criterion(5.0)).unwrap();
    let report = solution.prune.unwrap();
    assert!(report.removed >= 1);
    for k in 1..6 {
        assert_abs_diff_eq!(solution.increments[[k, 0]], 1.0, epsilon = 1e-6);
    }
}

#[test]
fn test_direct_policy_never_prunes() {
    let steps = [[1.0, 0.0, 0.0], [30.0, 0.0, 0.0]];
    let graph = CorrelationGraph::assemble(3, &exact(CorrelationPolicy::Direct, &steps)).unwrap();
    let solution = solve(&graph, CorrelationPolicy::Direct, &criterion(0.1)).unwrap();
    assert!(solution.prune.is_none());
    assert_abs_diff_eq!(solution.increments[[2, 0]], 30.0, epsilon = 1e-9);
}

#[test]
fn test_column_rank() {
    let m = nalgebra::DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 0.0, 2.0, 0.0]);
    assert_eq!(column_rank(&m), 1);
    assert_eq!(column_rank(&nalgebra::DMatrix::<f64>::identity(4, 4)), 4);
}
