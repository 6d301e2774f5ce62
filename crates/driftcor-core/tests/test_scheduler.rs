use driftcor_core::drift::{
    CorrelationGraph, CorrelationMethod, CorrelationPolicy, ShiftObservation,
};
use driftcor_core::error::DriftError;
use driftcor_core::frame::invalid_shift;

/// Exact observations of a constant drift of `step` per frame.
fn observations(policy: CorrelationPolicy, n: usize, step: f64) -> Vec<ShiftObservation> {
    policy
        .pairs(n)
        .into_iter()
        .map(|(anchor, target)| ShiftObservation {
            anchor,
            target,
            shift: [step * (target - anchor) as f64, 0.0, 0.0],
        })
        .collect()
}

#[test]
fn test_observation_counts() {
    let n = 7;
    assert_eq!(CorrelationPolicy::Direct.pairs(n).len(), n - 1);
    assert_eq!(CorrelationPolicy::Redundant.pairs(n).len(), n * (n - 1) / 2);
    for w in 1..n {
        let policy = CorrelationPolicy::Windowed { window: w };
        assert_eq!(policy.pairs(n).len(), n * w - w * (w + 1) / 2);
        assert_eq!(policy.observation_count(n), policy.pairs(n).len());
    }
}

#[test]
fn test_windowed_pairs_respect_gap() {
    let pairs = CorrelationPolicy::Windowed { window: 2 }.pairs(5);
    assert_eq!(
        pairs,
        vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (2, 4), (3, 4)]
    );
}

#[test]
fn test_method_mapping() {
    use CorrelationMethod::*;
    assert_eq!(CorrelationPolicy::from_method(Dcc, 5), CorrelationPolicy::Direct);
    assert_eq!(CorrelationPolicy::from_method(Rcc, 5), CorrelationPolicy::Redundant);
    assert_eq!(
        CorrelationPolicy::from_method(Mcc, 3),
        CorrelationPolicy::Windowed { window: 3 }
    );
    assert_eq!(CorrelationPolicy::from_method(Mcc, 0), CorrelationPolicy::Redundant);
}

#[test]
fn test_coefficient_rows_span_pair() {
    let obs = observations(CorrelationPolicy::Redundant, 4, 1.0);
    let graph = CorrelationGraph::assemble(4, &obs).unwrap();
    assert_eq!(graph.unknowns(), 3);
    assert_eq!(graph.len(), 6);
    for (row, &(i, j)) in graph.pairs.iter().enumerate() {
        for col in 0..3 {
            let expected = if col >= i && col < j { 1.0 } else { 0.0 };
            assert_eq!(graph.coefficients[(row, col)], expected);
        }
    }
}

#[test]
fn test_too_few_observations_is_fatal() {
    let mut obs = observations(CorrelationPolicy::Direct, 5, 1.0);
    obs.remove(2);
    match CorrelationGraph::assemble(5, &obs) {
        Err(DriftError::RankDeficient { achieved, required }) => {
            assert_eq!(achieved, 3);
            assert_eq!(required, 4);
        }
        other => panic!("expected rank deficiency, got {other:?}"),
    }
}

#[test]
fn test_invalid_row_absorbed_by_redundancy_only() {
    let n = 5;
    let mut redundant = observations(CorrelationPolicy::Redundant, n, 1.0);
    let hit = redundant.iter().position(|o| (o.anchor, o.target) == (2, 3)).unwrap();
    redundant[hit].shift = invalid_shift();
    let graph = CorrelationGraph::assemble(n, &redundant).unwrap();
    assert_eq!(graph.discarded, 1);
    assert_eq!(graph.len(), n * (n - 1) / 2 - 1);

    let mut direct = observations(CorrelationPolicy::Direct, n, 1.0);
    direct[2].shift = invalid_shift();
    assert!(matches!(
        CorrelationGraph::assemble(n, &direct),
        Err(DriftError::RankDeficient { .. })
    ));
}

#[test]
fn test_malformed_pair_rejected() {
    let obs = vec![ShiftObservation {
        anchor: 2,
        target: 1,
        shift: [0.0; 3],
    }];
    assert!(matches!(
        CorrelationGraph::assemble(3, &obs),
        Err(DriftError::Config(_))
    ));
}
