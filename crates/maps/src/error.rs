//! Contract violations for map construction and conversion.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MapError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Expected {expected} samples for the given dimensions, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    #[error("Sample {index} is not finite ({value})")]
    NonFinite { index: usize, value: f32 },

    #[error("Sample {index} = {value} is outside [0, 1]")]
    OutOfRange { index: usize, value: f32 },

    #[error("Strength must be finite and > 0, got {0}")]
    InvalidStrength(f32),

    #[error("Dimension mismatch: {left:?} vs {right:?}")]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
}
