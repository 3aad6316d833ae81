//! Error types for building a spatial index.

use thiserror::Error;

/// Result type for index construction.
pub type IndexResult<T> = Result<T, IndexError>;

/// Reasons a mesh cannot be indexed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index} (mesh has {vertex_count} vertices)")]
    InvalidIndex {
        /// Offending face.
        face: usize,
        /// The out-of-range index.
        index: u32,
        /// Total number of vertices.
        vertex_count: usize,
    },

    /// A vertex has a NaN or infinite coordinate.
    #[error("vertex {index} has a non-finite coordinate")]
    NonFinite {
        /// Offending vertex.
        index: usize,
    },
}
