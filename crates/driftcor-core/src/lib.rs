pub mod align;
pub mod consts;
pub mod drift;
pub mod error;
pub mod frame;
pub mod io;
pub mod mask;
pub mod parallel;
pub mod pipeline;
pub mod preprocess;
pub mod spectral;
