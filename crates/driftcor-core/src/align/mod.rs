pub mod estimator;
pub mod peak;
pub mod shifter;

pub use estimator::{debug_slice_shape, estimate_shift, estimate_shift_with_debug};
pub use shifter::{drift_to_pixels, reregister, shift_frame, ShiftedVolume};
