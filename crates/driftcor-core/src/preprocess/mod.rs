pub mod binning;
pub mod filter;

pub use binning::bin_stack;
pub use filter::{clip_and_taper, median_filter, tukey_window, ClipTaperParams};
