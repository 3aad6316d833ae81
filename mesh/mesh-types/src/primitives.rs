//! Closed box meshes.

use crate::{TriangleMesh, Vertex};
use nalgebra::Point3;

/// Axis-aligned box between two corners with outward-facing normals.
///
/// # Example
///
/// ```
/// use mesh_types::{cuboid, Point3, MeshTopology};
///
/// let slab = cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(20.0, 20.0, 2.0));
/// assert_eq!(slab.face_count(), 12);
/// assert!((slab.volume() - 800.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn cuboid(a: Point3<f64>, b: Point3<f64>) -> TriangleMesh {
    let (lo, hi) = (a.inf(&b), a.sup(&b));
    let vertices = vec![
        Vertex::from_coords(lo.x, lo.y, lo.z),
        Vertex::from_coords(hi.x, lo.y, lo.z),
        Vertex::from_coords(hi.x, hi.y, lo.z),
        Vertex::from_coords(lo.x, hi.y, lo.z),
        Vertex::from_coords(lo.x, lo.y, hi.z),
        Vertex::from_coords(hi.x, lo.y, hi.z),
        Vertex::from_coords(hi.x, hi.y, hi.z),
        Vertex::from_coords(lo.x, hi.y, hi.z),
    ];
    let faces = vec![
        // -Z
        [0, 2, 1],
        [0, 3, 2],
        // +Z
        [4, 5, 6],
        [4, 6, 7],
        // -Y
        [0, 1, 5],
        [0, 5, 4],
        // +Y
        [3, 7, 6],
        [3, 6, 2],
        // -X
        [0, 4, 7],
        [0, 7, 3],
        // +X
        [1, 2, 6],
        [1, 6, 5],
    ];
    TriangleMesh::from_parts(vertices, faces)
}

/// Cube of edge `size` standing on the XY plane, centered on the Z axis.
#[must_use]
pub fn cube(size: f64) -> TriangleMesh {
    let h = size * 0.5;
    cuboid(Point3::new(-h, -h, 0.0), Point3::new(h, h, size))
}

/// Cube from the origin to `(1, 1, 1)`.
#[must_use]
pub fn unit_cube() -> TriangleMesh {
    cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeshBounds;

    #[test]
    fn cube_sits_on_plane() {
        let c = cube(20.0);
        let b = c.bounds();
        assert!(b.min.z.abs() < f64::EPSILON);
        assert!((b.max.z - 20.0).abs() < f64::EPSILON);
        assert!((b.min.x + 10.0).abs() < f64::EPSILON);
        assert!((c.signed_volume() - 8000.0).abs() < 1e-6);
    }

    #[test]
    fn cuboid_accepts_swapped_corners() {
        let c = cuboid(Point3::new(1.0, 1.0, 1.0), Point3::origin());
        assert!((c.signed_volume() - 1.0).abs() < 1e-12);
    }
}
