pub mod fft;
pub mod transform;

pub use transform::{
    compute_spectra, transform, transform_into_cache, FrequencyFrame, SpectralLayout,
    SpectralStore, SpectrumSource,
};
