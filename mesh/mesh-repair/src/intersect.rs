//! Self-intersection detection.
//!
//! Candidate face pairs come from the bounding volume hierarchy of an
//! [`IndexedMesh`]; each pair is confirmed by testing the six edges of the
//! two triangles against the other triangle.

use mesh_index::IndexedMesh;
use mesh_types::{Aabb, Point3, Triangle, TriangleMesh};
use tracing::debug;

/// Settings for [`detect_self_intersections`].
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionParams {
    /// Tolerance of the edge/triangle tests.
    pub epsilon: f64,
    /// Stop after this many pairs. Zero means no limit.
    pub max_reported: usize,
    /// Ignore pairs of faces that share a vertex.
    pub skip_adjacent: bool,
}

impl Default for IntersectionParams {
    fn default() -> Self {
        Self {
            epsilon: 1e-10,
            max_reported: 100,
            skip_adjacent: true,
        }
    }
}

impl IntersectionParams {
    /// Set the pair limit.
    #[must_use]
    pub const fn with_max_reported(mut self, max: usize) -> Self {
        self.max_reported = max;
        self
    }

    /// Set the test tolerance.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Face pairs found crossing each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfIntersectionResult {
    /// Intersecting faces, lower index first, in ascending order.
    pub pairs: Vec<(usize, usize)>,
    /// The search stopped at [`IntersectionParams::max_reported`].
    pub truncated: bool,
}

impl SelfIntersectionResult {
    /// At least one pair was found.
    #[must_use]
    pub fn has_intersections(&self) -> bool {
        !self.pairs.is_empty()
    }

    /// Number of pairs found.
    #[must_use]
    pub fn count(&self) -> usize {
        self.pairs.len()
    }
}

/// Find faces of `mesh` that cross other faces.
///
/// A mesh that cannot be indexed (out-of-range indices, non-finite
/// coordinates) reports nothing.
///
/// # Example
///
/// ```
/// use mesh_types::{unit_cube, Vector3};
/// use mesh_repair::intersect::{detect_self_intersections, IntersectionParams};
///
/// let mut mesh = unit_cube();
/// assert!(!detect_self_intersections(&mesh, &IntersectionParams::default()).has_intersections());
///
/// let mut other = unit_cube();
/// other.translate(Vector3::new(0.5, 0.5, 0.5));
/// mesh.merge(&other);
/// assert!(detect_self_intersections(&mesh, &IntersectionParams::default()).has_intersections());
/// ```
#[must_use]
pub fn detect_self_intersections(
    mesh: &TriangleMesh,
    params: &IntersectionParams,
) -> SelfIntersectionResult {
    let mut result = SelfIntersectionResult::default();
    let index = match IndexedMesh::new(mesh) {
        Ok(index) => index,
        Err(e) => {
            debug!(error = %e, "mesh not indexable, no intersection test");
            return result;
        }
    };

    'faces: for (i, fa) in mesh.faces.iter().enumerate() {
        let Some(a) = index.triangle(i) else {
            continue;
        };
        let region = Aabb::from_points(a.vertices().iter()).expanded(params.epsilon);
        for j in index.faces_in(&region) {
            if j <= i {
                continue;
            }
            let fb = &mesh.faces[j];
            if params.skip_adjacent && shares_vertex(mesh, fa, fb) {
                continue;
            }
            let Some(b) = index.triangle(j) else {
                continue;
            };
            if triangles_intersect(a, b, params.epsilon) {
                result.pairs.push((i, j));
                if params.max_reported > 0 && result.pairs.len() >= params.max_reported {
                    result.truncated = true;
                    break 'faces;
                }
            }
        }
    }

    debug!(
        pairs = result.pairs.len(),
        truncated = result.truncated,
        "self-intersection check"
    );
    result
}

/// Whether any two non-adjacent faces of `mesh` cross.
#[must_use]
pub fn has_self_intersections(mesh: &TriangleMesh) -> bool {
    let params = IntersectionParams::default().with_max_reported(1);
    detect_self_intersections(mesh, &params).has_intersections()
}

/// Same vertex index, or the same position for unwelded soups.
fn shares_vertex(mesh: &TriangleMesh, a: &[u32; 3], b: &[u32; 3]) -> bool {
    a.iter().any(|&va| {
        b.iter()
            .any(|&vb| va == vb || mesh.position(va) == mesh.position(vb))
    })
}

/// Some edge of either triangle pierces the other.
fn triangles_intersect(a: &Triangle, b: &Triangle, epsilon: f64) -> bool {
    let (pa, pb) = (a.vertices(), b.vertices());
    (0..3).any(|k| edge_hits_triangle(&pa[k], &pa[(k + 1) % 3], &pb, epsilon))
        || (0..3).any(|k| edge_hits_triangle(&pb[k], &pb[(k + 1) % 3], &pa, epsilon))
}

/// Segment `e0`-`e1` against a triangle, Möller-Trumbore style.
fn edge_hits_triangle(
    e0: &Point3<f64>,
    e1: &Point3<f64>,
    tri: &[Point3<f64>; 3],
    epsilon: f64,
) -> bool {
    let dir = e1 - e0;
    if dir.norm_squared() < epsilon * epsilon {
        return false;
    }
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let h = dir.cross(&edge2);
    let det = edge1.dot(&h);
    // Parallel, including coplanar.
    if det.abs() < epsilon {
        return false;
    }
    let f = 1.0 / det;
    let s = e0 - tri[0];
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(&edge1);
    let v = f * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    let t = f * edge2.dot(&q);
    (-epsilon..=1.0 + epsilon).contains(&t)
}
