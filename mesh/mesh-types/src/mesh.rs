//! Indexed triangle mesh.

use crate::{Aabb, MeshBounds, MeshTopology, Triangle, Vertex};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A triangle mesh with shared, indexed vertices.
///
/// This is the value that flows between every stage of the SLA pipeline:
/// models come in as a `TriangleMesh`, and support trees and pads go out as
/// one. Faces use counter-clockwise winding seen from outside.
///
/// Indices are not validated on construction. Meshes straight from an
/// importer may reference missing vertices, contain slivers or be inside
/// out; run them through `mesh-repair` before relying on manifoldness.
///
/// # Example
///
/// ```
/// use mesh_types::{TriangleMesh, Vertex, MeshTopology};
///
/// let mut mesh = TriangleMesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
/// mesh.faces.push([0, 1, 2]);
///
/// assert_eq!(mesh.face_count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Vertex>,

    /// Faces as indices into `vertices`, CCW seen from outside.
    pub faces: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// An empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// An empty mesh with reserved storage.
    #[inline]
    #[must_use]
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Build a mesh from owned vertex and face buffers.
    #[inline]
    #[must_use]
    pub const fn from_parts(vertices: Vec<Vertex>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Build a mesh from flat coordinate and index arrays.
    ///
    /// Returns an empty mesh when either array length is not a multiple of 3.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{TriangleMesh, MeshTopology};
    ///
    /// let mesh = TriangleMesh::from_raw(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[0, 1, 2]);
    /// assert_eq!(mesh.vertex_count(), 3);
    /// ```
    #[must_use]
    pub fn from_raw(positions: &[f64], indices: &[u32]) -> Self {
        if positions.len() % 3 != 0 || indices.len() % 3 != 0 {
            return Self::new();
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|c| Vertex::from_coords(c[0], c[1], c[2]))
            .collect();
        let faces = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

        Self { vertices, faces }
    }

    /// Position of vertex `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; only call with indices taken from
    /// a validated face.
    #[inline]
    #[must_use]
    pub fn position(&self, index: u32) -> Point3<f64> {
        self.vertices[index as usize].position
    }

    /// Translate every vertex.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    /// Scale uniformly around the origin.
    pub fn scale(&mut self, factor: f64) {
        for vertex in &mut self.vertices {
            vertex.position.coords *= factor;
        }
    }

    /// Signed enclosed volume by the divergence theorem.
    ///
    /// Positive for a closed mesh with outward normals, negative when the mesh
    /// is inside out. Meaningless for open meshes.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|t| t.v0.coords.dot(&t.v1.coords.cross(&t.v2.coords)))
            .sum::<f64>()
            / 6.0
    }

    /// Absolute enclosed volume.
    #[inline]
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Whether the signed volume is negative.
    #[inline]
    #[must_use]
    pub fn is_inside_out(&self) -> bool {
        self.signed_volume() < 0.0
    }

    /// Total triangle area.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|tri| tri.area()).sum()
    }

    /// Reverse the winding of every face.
    pub fn flip_normals(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
    }

    /// Unit normal of face `index`, `None` for degenerate or missing faces.
    #[must_use]
    pub fn face_normal(&self, index: usize) -> Option<Vector3<f64>> {
        self.triangle(index).and_then(|t| t.normal())
    }

    /// Append another mesh, offsetting its indices.
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: indices are u32, meshes above 4G vertices are unsupported
    pub fn merge(&mut self, other: &Self) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
        );
    }

    /// Append a triangle given by positions, without sharing vertices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_triangle(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) {
        let base = self.vertices.len() as u32;
        self.vertices.extend([Vertex::new(a), Vertex::new(b), Vertex::new(c)]);
        self.faces.push([base, base + 1, base + 2]);
    }

    /// Lowest and highest Z, `None` for a mesh without vertices.
    #[must_use]
    pub fn z_range(&self) -> Option<(f64, f64)> {
        self.bounds_opt().map(|b| (b.min.z, b.max.z))
    }
}

impl MeshTopology for TriangleMesh {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn vertex(&self, index: usize) -> Option<&Vertex> {
        self.vertices.get(index)
    }

    fn face(&self, index: usize) -> Option<[u32; 3]> {
        self.faces.get(index).copied()
    }

    fn triangle(&self, face_index: usize) -> Option<Triangle> {
        let [a, b, c] = *self.faces.get(face_index)?;
        Some(Triangle::new(
            self.vertices.get(a as usize)?.position,
            self.vertices.get(b as usize)?.position,
            self.vertices.get(c as usize)?.position,
        ))
    }

    fn faces(&self) -> impl Iterator<Item = [u32; 3]> {
        self.faces.iter().copied()
    }

    fn triangles(&self) -> impl Iterator<Item = Triangle> {
        (0..self.faces.len()).filter_map(|i| self.triangle(i))
    }
}

impl MeshBounds for TriangleMesh {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| &v.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cuboid, unit_cube};

    #[test]
    fn empty_without_faces() {
        let mut mesh = TriangleMesh::new();
        assert!(mesh.is_empty());
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        assert!(mesh.is_empty());
        mesh.faces.push([0, 0, 0]);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn from_raw_rejects_ragged_input() {
        let mesh = TriangleMesh::from_raw(&[0.0, 1.0], &[0, 1, 2]);
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn triangle_skips_bad_indices() {
        let mut mesh = unit_cube();
        mesh.faces.push([0, 1, 99]);
        assert!(mesh.triangle(12).is_none());
        assert_eq!(mesh.triangles().count(), 12);
    }

    #[test]
    fn cube_volume_and_area() {
        let cube = unit_cube();
        assert!((cube.signed_volume() - 1.0).abs() < 1e-10);
        assert!((cube.surface_area() - 6.0).abs() < 1e-10);
        assert!(!cube.is_inside_out());
    }

    #[test]
    fn flip_turns_inside_out() {
        let mut cube = unit_cube();
        cube.flip_normals();
        assert!(cube.is_inside_out());
    }

    #[test]
    fn merge_offsets_indices() {
        let mut a = unit_cube();
        let b = cuboid(Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0));
        a.merge(&b);
        assert_eq!(a.vertex_count(), 16);
        assert_eq!(a.face_count(), 24);
        assert!(a.faces[12..].iter().all(|f| f.iter().all(|&i| i >= 8)));
        assert!((a.volume() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn translate_and_z_range() {
        let mut cube = unit_cube();
        cube.translate(Vector3::new(0.0, 0.0, 5.0));
        let (lo, hi) = cube.z_range().unwrap();
        assert!((lo - 5.0).abs() < f64::EPSILON);
        assert!((hi - 6.0).abs() < f64::EPSILON);
        assert!(TriangleMesh::new().z_range().is_none());
    }

    #[test]
    fn scale_cube() {
        let mut cube = unit_cube();
        cube.scale(2.0);
        assert!((cube.volume() - 8.0).abs() < 1e-10);
    }

    #[test]
    fn face_normal_points_out() {
        let cube = unit_cube();
        let bottom = cube.face_normal(0).unwrap();
        assert!((bottom.z + 1.0).abs() < 1e-12);
    }
}
