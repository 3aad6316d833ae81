//! Traits shared by mesh representations.

use crate::{Aabb, Triangle, Vertex};

/// Read-only topology access.
pub trait MeshTopology {
    /// Number of vertices.
    fn vertex_count(&self) -> usize;

    /// Number of triangles.
    fn face_count(&self) -> usize;

    /// A mesh with no vertices or no faces encloses nothing.
    fn is_empty(&self) -> bool {
        self.vertex_count() == 0 || self.face_count() == 0
    }

    /// Vertex by index.
    fn vertex(&self, index: usize) -> Option<&Vertex>;

    /// Face by index.
    fn face(&self, index: usize) -> Option<[u32; 3]>;

    /// Triangle with resolved positions.
    ///
    /// Returns `None` when the face or any of its indices is out of range.
    fn triangle(&self, face_index: usize) -> Option<Triangle>;

    /// Iterate over all faces.
    fn faces(&self) -> impl Iterator<Item = [u32; 3]>;

    /// Iterate over all triangles with resolved positions.
    ///
    /// Faces with out-of-range indices are skipped.
    fn triangles(&self) -> impl Iterator<Item = Triangle>;
}

/// Bounding box access.
pub trait MeshBounds {
    /// Axis-aligned bounds, empty for a mesh without vertices.
    fn bounds(&self) -> Aabb;

    /// Bounds, `None` when empty.
    fn bounds_opt(&self) -> Option<Aabb> {
        let b = self.bounds();
        if b.is_empty() { None } else { Some(b) }
    }
}
