//! The indexed mesh.

use mesh_types::{Aabb, MeshBounds, MeshTopology, Point3, Triangle, TriangleMesh, Vector3};
use tracing::debug;

use crate::bvh::Bvh;
use crate::error::{IndexError, IndexResult};
use crate::query::{closest_point_on_triangle, ray_triangle_intersect};

/// Skewed directions for the inside test. Axis-aligned rays would graze the
/// shared edges of axis-aligned models.
const INSIDE_RAYS: [[f64; 3]; 3] = [
    [0.132_4, 0.076_1, 1.0],
    [-0.091_7, 0.153_3, -1.0],
    [1.0, 0.211_9, -0.047_3],
];

/// A ray intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin along the normalized direction.
    pub distance: f64,
    /// Index of the hit face.
    pub face: usize,
    /// Hit location.
    pub point: Point3<f64>,
    /// Unit normal of the hit face, zero for a degenerate face.
    pub normal: Vector3<f64>,
}

/// Nearest surface point to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// Location on the surface.
    pub point: Point3<f64>,
    /// Face containing it.
    pub face: usize,
    /// Squared distance from the query.
    pub distance_squared: f64,
}

impl ClosestPoint {
    /// Distance from the query.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance_squared.sqrt()
    }
}

/// Immutable spatial index over a mesh snapshot.
///
/// Built once; a changed mesh needs a new index. All queries take `&self`
/// and the type is `Send + Sync`, so one index can serve parallel workers.
///
/// # Example
///
/// ```
/// use mesh_index::IndexedMesh;
/// use mesh_types::{cube, Point3, Vector3};
///
/// let index = IndexedMesh::new(&cube(10.0)).unwrap();
/// let hit = index.query_ray_hit(Point3::new(0.0, 0.0, 20.0), -Vector3::z()).unwrap();
/// assert!((hit.distance - 10.0).abs() < 1e-9);
/// assert!(index.is_inside(&Point3::new(0.0, 0.0, 5.0)));
/// ```
#[derive(Debug)]
pub struct IndexedMesh {
    mesh: TriangleMesh,
    triangles: Vec<Triangle>,
    normals: Vec<Vector3<f64>>,
    bounds: Aabb,
    bvh: Bvh,
}

impl IndexedMesh {
    /// Index `mesh`.
    ///
    /// An empty mesh yields an index whose queries all return `None`.
    ///
    /// # Errors
    ///
    /// [`IndexError`] when a face references a missing vertex or a vertex
    /// is not finite.
    pub fn new(mesh: &TriangleMesh) -> IndexResult<Self> {
        if let Some(index) = mesh.vertices.iter().position(|v| !v.is_finite()) {
            return Err(IndexError::NonFinite { index });
        }
        let vertex_count = mesh.vertex_count();
        for (face, f) in mesh.faces.iter().enumerate() {
            if let Some(&index) = f.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(IndexError::InvalidIndex {
                    face,
                    index,
                    vertex_count,
                });
            }
        }

        let triangles: Vec<Triangle> = mesh.triangles().collect();
        let normals = triangles
            .iter()
            .map(|t| t.normal().unwrap_or_else(Vector3::zeros))
            .collect();
        let bvh = Bvh::build(&triangles);
        debug!(faces = triangles.len(), "built mesh index");

        Ok(Self {
            mesh: mesh.clone(),
            triangles,
            normals,
            bounds: mesh.bounds(),
            bvh,
        })
    }

    /// The indexed snapshot.
    #[must_use]
    pub const fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// Bounds of the snapshot.
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// `true` when there is nothing to query.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of indexed faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    /// Lowest Z of the mesh, `None` when empty.
    #[must_use]
    pub fn ground_level(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.bounds.min.z)
    }

    /// Triangle `face`.
    #[must_use]
    pub fn triangle(&self, face: usize) -> Option<&Triangle> {
        self.triangles.get(face)
    }

    /// Unit normal of `face`, zero for a degenerate face.
    #[must_use]
    pub fn face_normal(&self, face: usize) -> Option<Vector3<f64>> {
        self.normals.get(face).copied()
    }

    /// First surface hit along the ray.
    ///
    /// `dir` need not be normalized; a zero direction hits nothing.
    #[must_use]
    pub fn query_ray_hit(&self, origin: Point3<f64>, dir: Vector3<f64>) -> Option<RayHit> {
        let dir = dir.try_normalize(f64::EPSILON)?;
        let (face, t) = self.bvh.nearest_hit(&origin, &dir, &|f| self.intersect(f, origin, dir))?;
        Some(self.hit(face, t, origin, dir))
    }

    /// Every surface hit along the ray, nearest first.
    #[must_use]
    pub fn query_ray_hits(&self, origin: Point3<f64>, dir: Vector3<f64>) -> Vec<RayHit> {
        let Some(dir) = dir.try_normalize(f64::EPSILON) else {
            return Vec::new();
        };
        let mut hits: Vec<RayHit> = self
            .bvh
            .all_hits(&origin, &dir, &|f| self.intersect(f, origin, dir))
            .into_iter()
            .map(|(face, t)| self.hit(face, t, origin, dir))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.face.cmp(&b.face)));
        hits
    }

    /// Nearest point on the surface.
    #[must_use]
    pub fn closest_point(&self, point: &Point3<f64>) -> Option<ClosestPoint> {
        let (face, distance_squared) = self.bvh.nearest(point, &|f| {
            let t = &self.triangles[f as usize];
            (closest_point_on_triangle(*point, t.v0, t.v1, t.v2) - point).norm_squared()
        })?;
        let t = &self.triangles[face as usize];
        Some(ClosestPoint {
            point: closest_point_on_triangle(*point, t.v0, t.v1, t.v2),
            face: face as usize,
            distance_squared,
        })
    }

    /// Squared distance to the surface.
    #[must_use]
    pub fn squared_distance(&self, point: &Point3<f64>) -> Option<f64> {
        self.closest_point(point).map(|c| c.distance_squared)
    }

    /// Whether `point` lies inside the closed surface.
    ///
    /// Majority vote over the crossing parity of three skewed rays, so a
    /// single ray grazing an edge does not flip the answer. Meaningless for
    /// open meshes.
    #[must_use]
    pub fn is_inside(&self, point: &Point3<f64>) -> bool {
        if self.is_empty() || !self.bounds.contains(point) {
            return false;
        }
        let votes = INSIDE_RAYS
            .iter()
            .filter(|d| {
                let dir = Vector3::new(d[0], d[1], d[2]);
                self.query_ray_hits(*point, dir).len() % 2 == 1
            })
            .count();
        votes >= 2
    }

    /// Distance to the surface, negative inside.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3<f64>) -> Option<f64> {
        let d = self.closest_point(point)?.distance();
        Some(if self.is_inside(point) { -d } else { d })
    }

    /// Faces whose bounds overlap `region`, ascending.
    #[must_use]
    pub fn faces_in(&self, region: &Aabb) -> Vec<usize> {
        let overlaps = |f: u32| {
            Aabb::from_points(self.triangles[f as usize].vertices().iter()).intersects(region)
        };
        self.bvh
            .overlapping(region, &overlaps)
            .into_iter()
            .map(|f| f as usize)
            .collect()
    }

    fn intersect(&self, face: u32, origin: Point3<f64>, dir: Vector3<f64>) -> Option<f64> {
        let t = &self.triangles[face as usize];
        ray_triangle_intersect(origin, dir, t.v0, t.v1, t.v2)
    }

    fn hit(&self, face: u32, t: f64, origin: Point3<f64>, dir: Vector3<f64>) -> RayHit {
        RayHit {
            distance: t,
            face: face as usize,
            point: origin + dir * t,
            normal: self.normals[face as usize],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_types::{cube, cuboid, Vertex};

    #[test]
    fn empty_mesh_answers_none() {
        let index = IndexedMesh::new(&TriangleMesh::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.ground_level().is_none());
        assert!(index.query_ray_hit(Point3::origin(), Vector3::z()).is_none());
        assert!(index.closest_point(&Point3::origin()).is_none());
        assert!(!index.is_inside(&Point3::origin()));
    }

    #[test]
    fn rejects_bad_indices_and_coordinates() {
        let bad = TriangleMesh::from_parts(vec![Vertex::from_coords(0.0, 0.0, 0.0)], vec![[0, 0, 3]]);
        assert_eq!(
            IndexedMesh::new(&bad).unwrap_err(),
            IndexError::InvalidIndex { face: 0, index: 3, vertex_count: 1 }
        );

        let mut nan = cube(1.0);
        nan.vertices[2] = Vertex::from_coords(f64::NAN, 0.0, 0.0);
        assert_eq!(IndexedMesh::new(&nan).unwrap_err(), IndexError::NonFinite { index: 2 });
    }

    #[test]
    fn ray_hits_top_then_bottom() {
        let index = IndexedMesh::new(&cube(10.0)).unwrap();
        let origin = Point3::new(1.0, 2.0, 30.0);
        let hit = index.query_ray_hit(origin, Vector3::new(0.0, 0.0, -5.0)).unwrap();
        assert_relative_eq!(hit.distance, 20.0, epsilon = 1e-9);
        assert_relative_eq!(hit.normal, Vector3::z(), epsilon = 1e-12);

        let hits = index.query_ray_hits(origin, -Vector3::z());
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[1].point.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(hits[1].normal, -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn ray_pointing_away_misses() {
        let index = IndexedMesh::new(&cube(10.0)).unwrap();
        assert!(index.query_ray_hit(Point3::new(0.0, 0.0, 30.0), Vector3::z()).is_none());
        assert!(index.query_ray_hit(Point3::new(0.0, 0.0, 30.0), Vector3::zeros()).is_none());
    }

    #[test]
    fn closest_point_on_faces() {
        let index = IndexedMesh::new(&cuboid(Point3::origin(), Point3::new(4.0, 4.0, 4.0))).unwrap();
        let c = index.closest_point(&Point3::new(2.0, 2.0, 7.0)).unwrap();
        assert_relative_eq!(c.point, Point3::new(2.0, 2.0, 4.0), epsilon = 1e-12);
        assert_relative_eq!(c.distance(), 3.0, epsilon = 1e-12);

        let inner = index.closest_point(&Point3::new(0.5, 2.0, 2.0)).unwrap();
        assert_relative_eq!(inner.distance_squared, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn inside_and_signed_distance() {
        let index = IndexedMesh::new(&cuboid(Point3::origin(), Point3::new(4.0, 4.0, 4.0))).unwrap();
        assert!(index.is_inside(&Point3::new(2.0, 2.0, 2.0)));
        assert!(index.is_inside(&Point3::new(0.1, 3.9, 0.1)));
        assert!(!index.is_inside(&Point3::new(5.0, 2.0, 2.0)));
        assert!(!index.is_inside(&Point3::new(2.0, 2.0, -0.5)));

        assert_relative_eq!(index.signed_distance(&Point3::new(2.0, 2.0, 3.0)).unwrap(), -1.0, epsilon = 1e-12);
        assert_relative_eq!(index.signed_distance(&Point3::new(2.0, 2.0, 6.0)).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn faces_in_region() {
        let index = IndexedMesh::new(&cuboid(Point3::origin(), Point3::new(4.0, 4.0, 4.0))).unwrap();
        let top = Aabb::new(Point3::new(1.0, 1.0, 3.9), Point3::new(3.0, 3.0, 4.1));
        let faces = index.faces_in(&top);
        // Only the two top triangles reach into the slab.
        assert_eq!(faces.len(), 2);
        assert!(faces.iter().all(|&f| index.triangle(f).unwrap().min_z() > 3.9));
        assert!(faces.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn index_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IndexedMesh>();
    }
}
