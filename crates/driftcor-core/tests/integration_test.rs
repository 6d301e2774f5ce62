#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use driftcor_core::drift::{sample_drift, CorrelationPolicy, DriftTrajectory};
use driftcor_core::frame::{FrameStack, LengthUnit, StackMetadata, VoxelSize};
use driftcor_core::pipeline::{
    correct_drift, estimate_drift, DriftConfig, NoOpReporter, PreprocessConfig,
};

use common::{normalized_rms, ramp_stack, textured_frame};

const TOLERANCE: f64 = 0.2;

fn assert_linear(trajectory: &DriftTrajectory, per_frame: [f64; 2], tolerance: f64) {
    for (k, d) in trajectory.displacement.iter().enumerate() {
        assert_abs_diff_eq!(d[0], per_frame[0] * k as f64, epsilon = tolerance);
        assert_abs_diff_eq!(d[1], per_frame[1] * k as f64, epsilon = tolerance);
    }
}

#[test]
fn test_every_policy_recovers_a_linear_ramp() {
    let stack = ramp_stack(&textured_frame(64), 5, 1, -1);
    for policy in [
        CorrelationPolicy::Redundant,
        CorrelationPolicy::Direct,
        CorrelationPolicy::Windowed { window: 2 },
    ] {
        let config = DriftConfig {
            policy,
            ..Default::default()
        };
        let report = estimate_drift(&stack, &config, &NoOpReporter).unwrap();
        assert_eq!(report.trajectory.len(), 5);
        assert_eq!(report.trajectory.displacement[0], [0.0, 0.0, 0.0]);
        // Content moving +v per frame is corrected by -v per frame.
        assert_linear(&report.trajectory, [-1.0, 1.0], TOLERANCE);
        assert_eq!(report.trajectory.time, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}

#[test]
fn test_redundant_reports_observations() {
    let stack = ramp_stack(&textured_frame(64), 5, 1, -1);
    let report = estimate_drift(&stack, &DriftConfig::default(), &NoOpReporter).unwrap();
    assert_eq!(report.observations, 10);
    assert_eq!(report.discarded, 0);
    let prune = report.prune.expect("redundant policy prunes");
    assert_eq!(prune.removed, 0);
    assert!(report.debug_correlation.is_none());
}

#[test]
fn test_voxel_size_scales_trajectory() {
    let base = ramp_stack(&textured_frame(64), 4, 2, 0);
    let metadata = StackMetadata {
        voxel: VoxelSize {
            x: 0.002,
            y: 0.002,
            z: 1.0,
            unit: LengthUnit::Micrometer,
        },
        ..Default::default()
    };
    let stack = FrameStack::new(base.into_frames(), metadata).unwrap();
    let report = estimate_drift(&stack, &DriftConfig::default(), &NoOpReporter).unwrap();
    // 2 nm per pixel, content moving 2 px per frame.
    assert_linear(&report.trajectory, [-4.0, 0.0], 2.0 * TOLERANCE);
}

#[test]
fn test_parallel_with_caches_matches_serial() {
    let dir = TempDir::new().unwrap();
    let spectra = dir.path().join("spectra.rec");
    let debug = dir.path().join("debug.rec");
    let stack = ramp_stack(&textured_frame(64), 5, 1, 2);

    let serial = estimate_drift(&stack, &DriftConfig::default(), &NoOpReporter).unwrap();

    let mut config = DriftConfig {
        parallel: true,
        ..Default::default()
    };
    config.cache.spectra = Some(spectra.clone());
    config.cache.debug_correlation = Some(debug.clone());
    let parallel = estimate_drift(&stack, &config, &NoOpReporter).unwrap();

    for (a, b) in serial
        .trajectory
        .displacement
        .iter()
        .zip(&parallel.trajectory.displacement)
    {
        for axis in 0..3 {
            assert_abs_diff_eq!(a[axis], b[axis], epsilon = 1e-6);
        }
    }

    let volume = parallel.debug_correlation.expect("debug volume requested");
    assert_eq!(volume.dim(), (10, 64, 64));

    assert!(!spectra.exists());
    assert!(!debug.exists());
}

#[test]
fn test_temporal_binning_places_samples_at_bin_centres() {
    let stack = ramp_stack(&textured_frame(64), 6, 1, 0);
    let config = DriftConfig {
        preprocess: Some(PreprocessConfig {
            filter: None,
            binning: Some([1, 1, 2]),
        }),
        ..Default::default()
    };
    let report = estimate_drift(&stack, &config, &NoOpReporter).unwrap();
    assert_eq!(report.trajectory.time, vec![0.5, 2.5, 4.5]);
    assert_linear(&report.trajectory, [-2.0, 0.0], TOLERANCE);

    let per_frame = sample_drift(&report.trajectory, stack.len(), 1);
    assert_abs_diff_eq!(per_frame[0][0], 0.0, epsilon = TOLERANCE);
    // Interpolated between the bin centres 2.5 and 4.5.
    assert_abs_diff_eq!(per_frame[3][0], -2.5, epsilon = TOLERANCE);
    assert_abs_diff_eq!(per_frame[5][0], -4.0, epsilon = TOLERANCE);
}

#[test]
fn test_estimate_then_correct_aligns_frames() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("shifted.rec");
    let reference = textured_frame(64);
    let stack = ramp_stack(&reference, 4, -1, 2);

    let mut config = DriftConfig::default();
    let report = estimate_drift(&stack, &config, &NoOpReporter).unwrap();
    config.cache.shifted = Some(output.clone());
    let shifted = correct_drift(
        &stack,
        &report.trajectory.displacement,
        &config,
        &NoOpReporter,
    )
    .unwrap();

    assert_eq!(shifted.len(), 4);
    for k in 0..4 {
        let frame = shifted.frame(k).unwrap();
        assert!(normalized_rms(&reference, &frame) < 0.1, "frame {k}");
    }
    drop(shifted);
    assert!(output.exists());
}
