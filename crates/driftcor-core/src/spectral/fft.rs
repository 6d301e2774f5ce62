use std::sync::Arc;

use ndarray::{s, Array3, Axis};
use num_complex::Complex;
use num_traits::Zero;
use rustfft::{Fft, FftDirection, FftPlanner};

/// Run a 1-D transform along every lane of `axis`.
fn transform_lanes(data: &mut Array3<Complex<f64>>, axis: usize, fft: &Arc<dyn Fft<f64>>) {
    let len = data.len_of(Axis(axis));
    if len < 2 {
        return;
    }
    let mut buffer = vec![Complex::zero(); len];
    for mut lane in data.lanes_mut(Axis(axis)) {
        for (b, v) in buffer.iter_mut().zip(lane.iter()) {
            *b = *v;
        }
        fft.process(&mut buffer);
        for (v, b) in lane.iter_mut().zip(buffer.iter()) {
            *v = *b;
        }
    }
}

/// Unnormalized complex transform along the listed axes, in place.
pub fn fft_axes(data: &mut Array3<Complex<f64>>, axes: &[usize], direction: FftDirection) {
    let mut planner = FftPlanner::new();
    for &axis in axes {
        let fft = planner.plan_fft(data.len_of(Axis(axis)), direction);
        transform_lanes(data, axis, &fft);
    }
}

/// Forward real transform over all three axes, keeping the non-negative half of
/// the last axis (`n / 2 + 1` bins).
pub fn rfft3(data: &Array3<f64>) -> Array3<Complex<f64>> {
    let (_, _, n) = data.dim();
    let mut full = data.mapv(|v| Complex::new(v, 0.0));
    fft_axes(&mut full, &[2], FftDirection::Forward);

    let mut half = full.slice(s![.., .., ..n / 2 + 1]).to_owned();
    fft_axes(&mut half, &[0, 1], FftDirection::Forward);
    half
}

/// Inverse of [`rfft3`]. `last_len` is the real length of the last axis.
pub fn irfft3(spectrum: &Array3<Complex<f64>>, last_len: usize) -> Array3<f64> {
    let (d0, d1, half) = spectrum.dim();
    debug_assert_eq!(half, last_len / 2 + 1);

    let mut work = spectrum.clone();
    fft_axes(&mut work, &[0, 1], FftDirection::Inverse);

    // Each lane along the last axis is now the spectrum of a real signal, so
    // the missing bins are conjugates of the stored ones.
    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(last_len);
    let scale = 1.0 / (d0 * d1 * last_len) as f64;
    let mut result = Array3::<f64>::zeros((d0, d1, last_len));
    let mut buffer = vec![Complex::zero(); last_len];

    for (lane, mut out) in work
        .lanes(Axis(2))
        .into_iter()
        .zip(result.lanes_mut(Axis(2)))
    {
        for k in 0..last_len {
            buffer[k] = if k < half {
                lane[k]
            } else {
                lane[last_len - k].conj()
            };
        }
        ifft.process(&mut buffer);
        for (o, b) in out.iter_mut().zip(buffer.iter()) {
            *o = b.re * scale;
        }
    }

    result
}

/// Sample frequencies (cycles per sample) of a full transform of length `n`.
pub fn fftfreq(n: usize) -> Vec<f64> {
    (0..n)
        .map(|k| {
            let k = if k < n.div_ceil(2) {
                k as f64
            } else {
                k as f64 - n as f64
            };
            k / n as f64
        })
        .collect()
}

/// Sample frequencies of the half axis produced by a real transform of length `n`.
pub fn rfftfreq(n: usize) -> Vec<f64> {
    (0..n / 2 + 1).map(|k| k as f64 / n as f64).collect()
}

/// Move the zero-lag sample away from the corner, undoing an fftshift.
pub fn ifftshift3(data: &Array3<f64>) -> Array3<f64> {
    let (d0, d1, d2) = data.dim();
    let (h0, h1, h2) = (d0 / 2, d1 / 2, d2 / 2);
    Array3::from_shape_fn((d0, d1, d2), |(i, j, k)| {
        data[[(i + h0) % d0, (j + h1) % d1, (k + h2) % d2]]
    })
}
