use ndarray::{Array3, Axis};

/// Binary dilation by a `width`-wide cube, with everything outside the volume
/// treated as background. Applied one axis at a time since a cube is separable.
pub fn dilate_cube(mask: &Array3<bool>, width: usize) -> Array3<bool> {
    let radius = width / 2;
    let mut result = mask.clone();
    for axis in 0..3 {
        result = dilate_along(&result, axis, radius);
    }
    result
}

fn dilate_along(mask: &Array3<bool>, axis: usize, radius: usize) -> Array3<bool> {
    let len = mask.len_of(Axis(axis));
    let mut result = Array3::from_elem(mask.dim(), false);
    for (src, mut dst) in mask
        .lanes(Axis(axis))
        .into_iter()
        .zip(result.lanes_mut(Axis(axis)))
    {
        for i in 0..len {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len - 1);
            dst[i] = (lo..=hi).any(|n| src[n]);
        }
    }
    result
}

/// Half-open bounds `[lo, hi)` of the set voxels along each axis, or `None`
/// for an empty mask.
pub fn bounding_box(mask: &Array3<bool>) -> Option<[(usize, usize); 3]> {
    let mut bounds = [(usize::MAX, 0usize); 3];
    let mut any = false;
    for ((i, j, k), &set) in mask.indexed_iter() {
        if !set {
            continue;
        }
        any = true;
        for (axis, idx) in [i, j, k].into_iter().enumerate() {
            bounds[axis].0 = bounds[axis].0.min(idx);
            bounds[axis].1 = bounds[axis].1.max(idx + 1);
        }
    }
    any.then_some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_voxel_grows_to_cube() {
        let mut mask = Array3::from_elem((9, 9, 1), false);
        mask[[4, 4, 0]] = true;
        let grown = dilate_cube(&mask, 5);
        assert_eq!(grown.iter().filter(|&&v| v).count(), 25);
        assert_eq!(bounding_box(&grown), Some([(2, 7), (2, 7), (0, 1)]));
    }

    #[test]
    fn test_dilation_clips_at_border() {
        let mut mask = Array3::from_elem((4, 4, 1), false);
        mask[[0, 0, 0]] = true;
        let grown = dilate_cube(&mask, 5);
        assert_eq!(grown.iter().filter(|&&v| v).count(), 9);
    }

    #[test]
    fn test_empty_mask_has_no_bounds() {
        let mask = Array3::from_elem((3, 3, 3), false);
        assert_eq!(bounding_box(&mask), None);
    }
}
