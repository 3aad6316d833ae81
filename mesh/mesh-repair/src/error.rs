//! Error types for mesh validation and repair.

use thiserror::Error;

/// Result type for validation and repair operations.
pub type RepairResult<T> = Result<T, RepairError>;

/// Structural problems found by [`validate_stl`](crate::validate_stl).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepairError {
    /// Mesh has no vertices or no faces.
    #[error("mesh is empty")]
    EmptyMesh,

    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index} (mesh has {vertex_count} vertices)")]
    InvalidIndex {
        /// Offending face.
        face: usize,
        /// The out-of-range index.
        index: u32,
        /// Total number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A vertex has a NaN or infinite coordinate.
    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteVertex {
        /// Offending vertex.
        index: usize,
    },
}
