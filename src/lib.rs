//! Real-time audio spectrum analysis for animated visualizers.

pub mod audio;
pub mod config;
pub mod effects;
pub mod encode;
pub mod error;
pub mod ring_buffer;
pub mod spectrum;

pub use error::{Result, SpectrumError};
pub use ring_buffer::RingBuffer;
