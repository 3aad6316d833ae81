//! Error types for mesh slicing operations.

use thiserror::Error;

/// Errors that can occur during slicing operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SliceError {
    /// The closing radius must be finite and non-negative.
    #[error("Invalid closing radius: {0} (must be >= 0)")]
    InvalidClosingRadius(f64),

    /// The job was cancelled between layers.
    #[error("Slicing cancelled")]
    Cancelled,
}

/// Result type for slicing operations.
pub type SliceResult<T> = std::result::Result<T, SliceError>;
