//! Error types for support generation.

use mesh_slice::SliceError;
use thiserror::Error;

/// Result type for support generation.
pub type SupportResult<T> = Result<T, SupportError>;

/// Errors that can occur while placing support points or building a tree.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SupportError {
    /// A configuration value is out of range.
    #[error("invalid `{field}` = {value}: must be {expected}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// The provided value.
        value: f64,
        /// The accepted range.
        expected: &'static str,
    },

    /// Slices and slice heights differ in length.
    #[error("got {slices} slices for {heights} heights")]
    LayerMismatch {
        /// Number of slice layers.
        slices: usize,
        /// Number of heights.
        heights: usize,
    },

    /// The job was cancelled.
    #[error("support generation cancelled")]
    Cancelled,

    /// Slicing the support mesh failed.
    #[error(transparent)]
    Slice(#[from] SliceError),
}

impl SupportError {
    pub(crate) const fn invalid(field: &'static str, value: f64, expected: &'static str) -> Self {
        Self::InvalidConfig {
            field,
            value,
            expected,
        }
    }
}
