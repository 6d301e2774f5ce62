use approx::assert_abs_diff_eq;
use ndarray::array;

use driftcor_core::drift::{frame_times, integrate, sample_drift, DriftTrajectory};
use driftcor_core::frame::{LengthUnit, StackMetadata, VoxelSize};

fn metadata(x: f64, unit: LengthUnit, time_bin: usize) -> StackMetadata {
    StackMetadata {
        voxel: VoxelSize { x, y: x, z: 1.0, unit },
        binning: [1, 1, time_bin],
    }
}

#[test]
fn test_cumulative_sum_starts_at_zero() {
    let increments = array![[0.0, 0.0, 0.0], [1.0, -1.0, 0.0], [0.5, 0.0, 0.0], [1.5, 2.0, 0.0]];
    let trajectory = integrate(&increments, &metadata(1.0, LengthUnit::Nanometer, 1));
    assert_eq!(trajectory.len(), 4);
    assert_eq!(trajectory.displacement[0], [0.0, 0.0, 0.0]);
    assert_eq!(trajectory.displacement[3], [3.0, 1.0, 0.0]);
    assert_eq!(trajectory.time, vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_micrometer_voxels_scaled_to_nm() {
    let increments = array![[0.0, 0.0, 0.0], [2.0, 1.0, 0.0]];
    let trajectory = integrate(&increments, &metadata(0.1, LengthUnit::Micrometer, 1));
    assert_abs_diff_eq!(trajectory.displacement[1][0], 200.0, epsilon = 1e-9);
    assert_abs_diff_eq!(trajectory.displacement[1][1], 100.0, epsilon = 1e-9);
}

#[test]
fn test_binned_time_axis_uses_bin_centres() {
    assert_eq!(frame_times(3, 1), vec![0.0, 1.0, 2.0]);
    assert_eq!(frame_times(3, 4), vec![1.5, 5.5, 9.5]);

    let increments = array![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]];
    let trajectory = integrate(&increments, &metadata(1.0, LengthUnit::Nanometer, 4));
    assert_eq!(trajectory.time, vec![1.5, 5.5]);
}

#[test]
fn test_binned_trajectory_resampled_per_frame() {
    let trajectory = DriftTrajectory {
        time: frame_times(2, 4),
        displacement: vec![[0.0, 0.0, 0.0], [4.0, -8.0, 0.0]],
    };
    let drift = sample_drift(&trajectory, 8, 1);
    assert_eq!(drift.len(), 8);
    assert_eq!(drift[0], [0.0, 0.0, 0.0]);
    assert_eq!(drift[1], [0.0, 0.0, 0.0]);
    assert_abs_diff_eq!(drift[3][0], 1.5, epsilon = 1e-12);
    assert_eq!(drift[7], [4.0, -8.0, 0.0]);
}

#[test]
fn test_trajectory_json_round_trip() {
    let trajectory = DriftTrajectory {
        time: vec![0.0, 1.0],
        displacement: vec![[0.0, 0.0, 0.0], [1.25, -2.5, 0.0]],
    };
    let json = serde_json::to_string(&trajectory).unwrap();
    assert!(json.contains("\"displacement\""));
    let back: DriftTrajectory = serde_json::from_str(&json).unwrap();
    assert_eq!(back, trajectory);
}
