//! Spectrum analysis: FFT magnitudes to a small sequence of display points.

pub mod mapping;
pub mod pipeline;
pub mod reducer;
pub mod settings;

pub use mapping::{FrequencyMapper, FrequencyMapping};
pub use pipeline::{SpectrumContext, SpectrumPipeline};
pub use reducer::{crop, reduce, ReduceOptions, SpectrumPoint};
pub use settings::{ScalingStrategy, SpectrumSettings};
