use std::f64::consts::PI;

use nalgebra::DVector;
use ndarray::{s, Array2, Array3, Axis, Zip};
use num_complex::Complex;

use crate::consts::{
    BORDER_EXCLUSION_MIN_AXIS, BORDER_EXCLUSION_SIXTEENTHS, MULTIQUADRIC_EPSILON,
    PEAK_DILATION_WIDTH, PEAK_THRESHOLD_FRACTION, SPECTRUM_SMOOTHING_SIGMA,
};
use crate::error::Result;
use crate::frame::{invalid_shift, Shift};
use crate::io::record::RecordFile;
use crate::mask::components::label_components;
use crate::mask::morphology::{bounding_box, dilate_cube};
use crate::spectral::fft::{fftfreq, ifftshift3, irfft3, rfftfreq};
use crate::spectral::{FrequencyFrame, SpectralLayout};

use super::peak::{maximize, MultiquadricRbf};

/// Sub-pixel displacement of `a` relative to `b`, minus `origin`.
///
/// Both spectra must share a layout. Returns the all-NaN shift when the
/// correlation carries no usable peak.
pub fn estimate_shift(a: &FrequencyFrame, b: &FrequencyFrame, origin: &Shift) -> Shift {
    run_estimate(a, b, origin, false).0
}

/// Like [`estimate_shift`], also writing the thresholded correlation map,
/// averaged along its shortest axis, into slot `index` of `debug`.
pub fn estimate_shift_with_debug(
    a: &FrequencyFrame,
    b: &FrequencyFrame,
    origin: &Shift,
    debug: &mut RecordFile<f64>,
    index: usize,
) -> Result<Shift> {
    let (shift, slice) = run_estimate(a, b, origin, true);
    if let Some(slice) = slice {
        debug.write(index, slice.view())?;
        debug.flush()?;
    }
    Ok(shift)
}

/// Shape of one debug correlation slice for frames of this layout.
pub fn debug_slice_shape(layout: &SpectralLayout) -> [usize; 2] {
    let shape = layout.real_shape();
    let short = shortest_axis(&shape);
    let kept: Vec<usize> = (0..3).filter(|&a| a != short).map(|a| shape[a]).collect();
    [kept[0], kept[1]]
}

fn shortest_axis(shape: &[usize; 3]) -> usize {
    let mut short = 0;
    for axis in 1..3 {
        if shape[axis] < shape[short] {
            short = axis;
        }
    }
    short
}

fn run_estimate(
    a: &FrequencyFrame,
    b: &FrequencyFrame,
    origin: &Shift,
    want_debug: bool,
) -> (Shift, Option<Array2<f64>>) {
    let corr = correlation_map(a, b);
    let sum = corr.sum();
    if sum == 0.0 || !sum.is_finite() {
        return (invalid_shift(), None);
    }

    let mask = peak_mask(&corr);
    let thresholded = match &mask {
        Some(mask) => &corr * &mask.mapv(|m| if m { 1.0 } else { 0.0 }),
        None => Array3::zeros(corr.dim()),
    };
    let debug = want_debug.then(|| collapse_shortest(&thresholded));

    let shift = mask
        .and_then(|mask| locate_peak(&thresholded, &mask))
        .map(|peak| {
            let peak = a.layout.to_frame(&peak);
            [peak[0] - origin[0], peak[1] - origin[1], peak[2] - origin[2]]
        })
        .unwrap_or_else(invalid_shift);
    (shift, debug)
}

/// Smoothed cross-correlation magnitude, zero lag moved to the centre.
fn correlation_map(a: &FrequencyFrame, b: &FrequencyFrame) -> Array3<f64> {
    let [d0, d1, n] = a.layout.real_shape();
    let (f0, f1, f2) = (fftfreq(d0), fftfreq(d1), rfftfreq(n));
    // Both spectra are smoothed, so the cross spectrum carries the gaussian twice.
    let coeff = -4.0 * PI * PI * SPECTRUM_SMOOTHING_SIGMA * SPECTRUM_SMOOTHING_SIGMA;

    let mut cross = Array3::<Complex<f64>>::zeros(a.spectrum.dim());
    Zip::indexed(&mut cross)
        .and(&a.spectrum)
        .and(&b.spectrum)
        .for_each(|(i, j, k), out, &fa, &fb| {
            let f2sum = f0[i] * f0[i] + f1[j] * f1[j] + f2[k] * f2[k];
            *out = fa * fb.conj() * (coeff * f2sum).exp();
        });

    let corr = irfft3(&cross, n).mapv(f64::abs);
    ifftshift3(&corr)
}

/// Central window per axis: the outer 6/16 on each side is dropped for axes
/// of at least 16 samples.
fn search_window(len: usize) -> (usize, usize) {
    if len >= BORDER_EXCLUSION_MIN_AXIS {
        let margin = len * BORDER_EXCLUSION_SIXTEENTHS / 16;
        (margin, len - margin)
    } else {
        (0, len)
    }
}

/// Threshold the central window, keep the strongest component and grow it.
fn peak_mask(corr: &Array3<f64>) -> Option<Array3<bool>> {
    let (d0, d1, d2) = corr.dim();
    let (w0, w1, w2) = (search_window(d0), search_window(d1), search_window(d2));
    let window = corr.slice(s![w0.0..w0.1, w1.0..w1.1, w2.0..w2.1]);

    let (min, max) = window
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let threshold = (max - min) * PEAK_THRESHOLD_FRACTION + min;

    let mut mask = Array3::from_elem(corr.dim(), false);
    mask.slice_mut(s![w0.0..w0.1, w1.0..w1.1, w2.0..w2.1])
        .zip_mut_with(&window, |m, &v| *m = v > threshold);

    let labeling = label_components(&mask);
    if labeling.count == 0 {
        return None;
    }
    if labeling.count > 1 {
        let means = labeling.component_means(corr);
        let mut best = 0;
        for (c, &m) in means.iter().enumerate() {
            if m > means[best] {
                best = c;
            }
        }
        mask = labeling.component_mask(best as u32 + 1);
    }

    Some(dilate_cube(&mask, PEAK_DILATION_WIDTH))
}

/// Fit the masked peak and return its position in layout coordinates.
fn locate_peak(thresholded: &Array3<f64>, mask: &Array3<bool>) -> Option<Shift> {
    let bounds = bounding_box(mask)?;
    let crop = thresholded.slice(s![
        bounds[0].0..bounds[0].1,
        bounds[1].0..bounds[1].1,
        bounds[2].0..bounds[2].1
    ]);

    // Zeros are outside the mask: leave them out of the fit rather than pull
    // the surface down.
    let peak = crop.iter().copied().filter(|v| *v != 0.0).fold(f64::NAN, f64::max);
    if peak.is_nan() || peak <= 0.0 {
        return None;
    }

    // Degenerate axes carry no information and are left out of the fit.
    let active: Vec<usize> = (0..3).filter(|&axis| thresholded.len_of(Axis(axis)) > 1).collect();
    if active.is_empty() {
        return None;
    }

    let mut points = Vec::new();
    let mut values = Vec::new();
    for ((i, j, k), &v) in crop.indexed_iter() {
        if v == 0.0 || !v.is_finite() {
            continue;
        }
        let local = [i, j, k];
        points.push(DVector::from_iterator(
            active.len(),
            active.iter().map(|&axis| local[axis] as f64),
        ));
        values.push(v / peak);
    }

    let rbf = MultiquadricRbf::fit(&points, &values, MULTIQUADRIC_EPSILON)?;
    let crop_shape = crop.shape();
    let start = DVector::from_iterator(
        active.len(),
        active.iter().map(|&axis| 0.5 * crop_shape[axis] as f64),
    );
    let best = maximize(&rbf, start);
    if best.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut position = [0.0; 3];
    for (slot, &axis) in active.iter().enumerate() {
        position[axis] = best[slot] + bounds[axis].0 as f64;
    }
    Some(position)
}

fn collapse_shortest(map: &Array3<f64>) -> Array2<f64> {
    let (d0, d1, d2) = map.dim();
    let short = shortest_axis(&[d0, d1, d2]);
    map.mean_axis(Axis(short))
        .unwrap_or_else(|| Array2::zeros((0, 0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_window_small_axis_untouched() {
        assert_eq!(search_window(1), (0, 1));
        assert_eq!(search_window(15), (0, 15));
    }

    #[test]
    fn test_search_window_large_axis_keeps_centre() {
        assert_eq!(search_window(64), (24, 40));
        assert_eq!(search_window(16), (6, 10));
    }

    #[test]
    fn test_debug_slice_drops_shortest_axis() {
        let layout = SpectralLayout::for_frame_shape((32, 48, 1));
        // Layout order puts the 48-long axis last.
        assert_eq!(layout.real_shape(), [32, 1, 48]);
        assert_eq!(debug_slice_shape(&layout), [32, 48]);
    }
}
