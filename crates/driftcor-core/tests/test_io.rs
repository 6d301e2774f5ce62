#[allow(dead_code)]
mod common;

use tempfile::TempDir;

use driftcor_core::error::DriftError;
use driftcor_core::frame::{AxisTag, FrameStack, StackMetadata};
use driftcor_core::io::{load_volume, save_stack, SerReader};

use common::{blob_frame, build_ser_u16};

#[test]
fn test_ser_frames_decoded_as_x_y() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("video.ser");
    // 3 wide, 2 high; rows stored top to bottom.
    let frames = vec![vec![1u16, 2, 3, 4, 5, 6], vec![600, 500, 400, 300, 200, 100]];
    std::fs::write(&path, build_ser_u16(3, 2, &frames)).unwrap();

    let reader = SerReader::open(&path).unwrap();
    assert_eq!(reader.frame_count(), 2);
    assert_eq!(reader.header.pixel_depth, 16);

    let stack = reader.read_stack(StackMetadata::default()).unwrap();
    assert_eq!(stack.frame_shape(), (3, 2, 1));
    assert_eq!(stack.frame(0)[[2, 0, 0]], 3.0);
    assert_eq!(stack.frame(0)[[0, 1, 0]], 4.0);
    assert_eq!(stack.frame(1)[[2, 1, 0]], 100.0);
    assert!(matches!(
        reader.read_frame(2),
        Err(DriftError::RecordIndexOutOfRange { .. })
    ));
}

#[test]
fn test_truncated_ser_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.ser");
    let mut bytes = build_ser_u16(4, 4, &[vec![0u16; 16]]);
    bytes.truncate(bytes.len() - 4);
    std::fs::write(&path, bytes).unwrap();
    assert!(matches!(SerReader::open(&path), Err(DriftError::InvalidSer(_))));
}

#[test]
fn test_saved_stack_reloads_with_time_axis_first() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack.rec");
    let frames = vec![blob_frame(8, 3.0, 4.0, 1.0), blob_frame(8, 4.0, 4.0, 1.0)];
    let stack = FrameStack::new(frames, StackMetadata::default()).unwrap();
    save_stack(&stack, &path).unwrap();

    let tags = AxisTag::parse_list("txyz").unwrap();
    let loaded = load_volume(&path, &tags, StackMetadata::default()).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.frame_shape(), (8, 8, 1));
    assert_eq!(loaded.frame(1), stack.frame(1));
}
