use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectrumError {
    /// A construction or configuration parameter was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Indexed access outside of a container's bounds.
    #[error("index {index} is out of range for a buffer of length {len}")]
    OutOfRange { index: isize, len: usize },
}

pub type Result<T> = std::result::Result<T, SpectrumError>;

pub(crate) fn invalid(msg: impl Into<String>) -> SpectrumError {
    SpectrumError::InvalidConfiguration(msg.into())
}
