use ndarray::{ArrayD, IxDyn};

use driftcor_core::error::DriftError;
use driftcor_core::frame::{AxisMap, AxisTag, FrameStack, StackMetadata};

#[test]
fn test_three_axes_register_on_third() {
    let map = AxisMap::from_tags(&AxisTag::parse_list("xyt").unwrap()).unwrap();
    assert_eq!((map.x, map.y, map.registration, map.depth), (0, 1, 2, None));
}

#[test]
fn test_four_axes_prefer_time() {
    let map = AxisMap::from_tags(&AxisTag::parse_list("XYZT").unwrap()).unwrap();
    assert_eq!(map.registration, 3);
    assert_eq!(map.depth, Some(2));

    let map = AxisMap::from_tags(&AxisTag::parse_list("txyz").unwrap()).unwrap();
    assert_eq!((map.x, map.y, map.registration, map.depth), (1, 2, 0, Some(3)));

    let map = AxisMap::from_tags(&AxisTag::parse_list("xycz").unwrap()).unwrap();
    assert_eq!(map.registration, 3);
    assert_eq!(map.depth, Some(2));
}

#[test]
fn test_four_axes_without_time_or_depth_fail() {
    let tags = AxisTag::parse_list("xycc").unwrap();
    assert!(matches!(
        AxisMap::from_tags(&tags),
        Err(DriftError::AmbiguousRegistrationAxis { .. })
    ));
}

#[test]
fn test_unsupported_dimensionality() {
    let tags = AxisTag::parse_list("xy").unwrap();
    assert!(matches!(
        AxisMap::from_tags(&tags),
        Err(DriftError::UnsupportedDimensions { ndim: 2 })
    ));
    assert!(AxisTag::parse_list("xyq").is_err());
}

#[test]
fn test_volume_split_into_frames() {
    // Axes (t, x, y): value encodes all three indices.
    let volume = ArrayD::from_shape_fn(IxDyn(&[3, 4, 5]), |ix| {
        (ix[0] * 100 + ix[1] * 10 + ix[2]) as f32
    });
    let stack = FrameStack::from_volume(
        &volume,
        &AxisTag::parse_list("txy").unwrap(),
        StackMetadata::default(),
    )
    .unwrap();
    assert_eq!(stack.len(), 3);
    assert_eq!(stack.frame_shape(), (4, 5, 1));
    assert_eq!(stack.frame(2)[[3, 4, 0]], 234.0);
}

#[test]
fn test_four_dimensional_volume_keeps_depth() {
    let volume = ArrayD::from_shape_fn(IxDyn(&[2, 3, 4, 2]), |ix| {
        (ix[0] * 1000 + ix[1] * 100 + ix[2] * 10 + ix[3]) as f32
    });
    // x, z, y, t
    let stack = FrameStack::from_volume(
        &volume,
        &AxisTag::parse_list("xzyt").unwrap(),
        StackMetadata::default(),
    )
    .unwrap();
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.frame_shape(), (2, 4, 3));
    // frame t=1, x=1, y=2, z=0
    assert_eq!(stack.frame(1)[[1, 2, 0]], 1021.0);
}
