use driftcor_core::frame::{Frame, FrameStack, StackMetadata};
use ndarray::Array3;

/// A gaussian blob of width `sigma` centred at (cx, cy) on an `n x n x 1` frame.
pub fn blob_frame(n: usize, cx: f64, cy: f64, sigma: f64) -> Frame {
    Array3::from_shape_fn((n, n, 1), |(x, y, _)| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        (1000.0 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()) as f32
    })
}

/// Two blobs of different size, so the frame has no mirror symmetry.
pub fn textured_frame(n: usize) -> Frame {
    let c = n as f64 / 2.0;
    let mut frame = blob_frame(n, c - 3.0, c + 2.0, 3.0);
    frame += &blob_frame(n, c + 4.0, c - 2.0, 2.0).mapv(|v| v * 0.6);
    frame
}

/// Circularly translate the content of a frame by whole pixels.
pub fn roll(frame: &Frame, dx: isize, dy: isize) -> Frame {
    let (nx, ny, nz) = frame.dim();
    Array3::from_shape_fn((nx, ny, nz), |(x, y, z)| {
        let sx = (x as isize - dx).rem_euclid(nx as isize) as usize;
        let sy = (y as isize - dy).rem_euclid(ny as isize) as usize;
        frame[[sx, sy, z]]
    })
}

/// `count` frames whose content moves by (vx, vy) pixels per frame.
pub fn ramp_stack(base: &Frame, count: usize, vx: isize, vy: isize) -> FrameStack {
    let frames = (0..count)
        .map(|k| roll(base, vx * k as isize, vy * k as isize))
        .collect();
    FrameStack::new(frames, StackMetadata::default()).unwrap()
}

/// Root-mean-square difference divided by the RMS of `reference`.
pub fn normalized_rms(reference: &Frame, other: &Frame) -> f64 {
    let mut diff = 0.0;
    let mut norm = 0.0;
    for (&a, &b) in reference.iter().zip(other.iter()) {
        diff += ((a - b) as f64).powi(2);
        norm += (a as f64).powi(2);
    }
    (diff / norm).sqrt()
}

/// Build a mono SER file image from 16-bit frames stored row by row.
pub fn build_ser_u16(width: usize, height: usize, frames: &[Vec<u16>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"LUCAM-RECORDER");
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&16i32.to_le_bytes());
    buf.extend_from_slice(&(frames.len() as i32).to_le_bytes());
    buf.extend_from_slice(&[0u8; 120]);
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    assert_eq!(buf.len(), 178);
    for frame in frames {
        for v in frame {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    buf
}
