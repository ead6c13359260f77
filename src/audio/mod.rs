pub mod analysis;
pub mod capture;
pub mod decode;
pub mod fft;
pub mod frame_cache;

pub use fft::{FftProvider, RustFftProvider};
pub use frame_cache::{ConsumerToken, FftFrameCache, SharedFrameCache};
