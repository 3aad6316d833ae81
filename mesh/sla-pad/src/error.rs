//! Error types for pad generation.

use mesh_slice::SliceError;
use thiserror::Error;

/// Result type for pad generation.
pub type PadResult<T> = Result<T, PadError>;

/// Errors that can occur while building a pad.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PadError {
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

    /// A pad cap could not be triangulated.
    #[error("failed to triangulate a {vertices}-vertex pad outline")]
    Triangulation {
        /// Vertex count of the outline.
        vertices: usize,
    },

    /// Slicing the model footprint failed.
    #[error(transparent)]
    Slice(#[from] SliceError),
}

impl PadError {
    pub(crate) const fn invalid(field: &'static str, value: f64, expected: &'static str) -> Self {
        Self::InvalidConfig {
            field,
            value,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PadError::invalid("wall_thickness_mm", 0.0, "finite and > 0");
        assert_eq!(format!("{err}"), "invalid `wall_thickness_mm` = 0: must be finite and > 0");

        let err = PadError::Triangulation { vertices: 7 };
        assert!(format!("{err}").contains("7-vertex"));
    }
}
