//! Mesh validation and health reporting.

use hashbrown::HashSet;
use mesh_types::{MeshTopology, TriangleMesh};

use crate::adjacency::MeshAdjacency;
use crate::error::{RepairError, RepairResult};
use crate::intersect::{detect_self_intersections, IntersectionParams};

/// Area below which [`validate_mesh`] counts a face as degenerate.
pub const DEGENERATE_AREA: f64 = 1e-12;

/// Snapshot of a mesh's health.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshReport {
    /// Total number of vertices.
    pub vertex_count: usize,
    /// Total number of faces.
    pub face_count: usize,
    /// Number of distinct undirected edges.
    pub edge_count: usize,

    /// Faces referencing a vertex that does not exist.
    pub invalid_face_count: usize,
    /// Edges with one incident face.
    pub boundary_edge_count: usize,
    /// Edges with more than two incident faces.
    pub non_manifold_edge_count: usize,
    /// Manifold edges walked in the same direction by both faces.
    pub inconsistent_edge_count: usize,
    /// Faces with near-zero area or repeated indices.
    pub degenerate_face_count: usize,
    /// Faces repeating another face's vertex set.
    pub duplicate_face_count: usize,
    /// Vertices no face refers to.
    pub unreferenced_vertex_count: usize,
    /// Pairs of non-adjacent faces crossing each other, capped at the
    /// default [`IntersectionParams::max_reported`]. Repair leaves these
    /// alone.
    pub self_intersection_count: usize,

    /// No boundary edges.
    pub is_watertight: bool,
    /// Every edge has exactly two faces.
    pub is_manifold: bool,
    /// Signed volume is negative.
    pub is_inside_out: bool,
}

impl MeshReport {
    /// Watertight, manifold, consistently and outwardly wound.
    #[must_use]
    pub fn is_printable(&self) -> bool {
        self.is_watertight
            && self.is_manifold
            && self.inconsistent_edge_count == 0
            && !self.is_inside_out
    }

    /// Any defect at all.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        self.issue_count() > 0 || self.is_inside_out
    }

    /// Total number of defects counted.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.invalid_face_count
            + self.boundary_edge_count
            + self.non_manifold_edge_count
            + self.inconsistent_edge_count
            + self.degenerate_face_count
            + self.duplicate_face_count
            + self.unreferenced_vertex_count
            + self.self_intersection_count
    }
}

impl std::fmt::Display for MeshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Mesh: {} vertices, {} faces, {} edges",
            self.vertex_count, self.face_count, self.edge_count
        )?;
        writeln!(
            f,
            "  watertight: {}, manifold: {}, inside-out: {}",
            self.is_watertight, self.is_manifold, self.is_inside_out
        )?;
        let issues = [
            ("invalid faces", self.invalid_face_count),
            ("boundary edges", self.boundary_edge_count),
            ("non-manifold edges", self.non_manifold_edge_count),
            ("inconsistent edges", self.inconsistent_edge_count),
            ("degenerate faces", self.degenerate_face_count),
            ("duplicate faces", self.duplicate_face_count),
            ("unreferenced vertices", self.unreferenced_vertex_count),
            ("self-intersections", self.self_intersection_count),
        ];
        for (label, count) in issues.iter().filter(|(_, c)| *c > 0) {
            writeln!(f, "  {label}: {count}")?;
        }
        Ok(())
    }
}

/// Inspect a mesh without modifying it.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
/// use mesh_repair::validate_mesh;
///
/// let report = validate_mesh(&unit_cube());
/// assert!(report.is_printable());
/// assert_eq!(report.edge_count, 18);
/// ```
#[must_use]
pub fn validate_mesh(mesh: &TriangleMesh) -> MeshReport {
    let vertex_count = mesh.vertices.len();
    let in_range = |f: &[u32; 3]| f.iter().all(|&i| (i as usize) < vertex_count);

    let valid: Vec<[u32; 3]> = mesh.faces.iter().copied().filter(in_range).collect();
    let adjacency = MeshAdjacency::build(&valid);

    let degenerate_face_count = valid
        .iter()
        .filter(|f| is_degenerate_face(mesh, **f, DEGENERATE_AREA))
        .count();

    let referenced: HashSet<u32> = valid.iter().flatten().copied().collect();

    let indexable = TriangleMesh::from_parts(mesh.vertices.clone(), valid.clone());
    let self_intersection_count =
        detect_self_intersections(&indexable, &IntersectionParams::default()).count();

    MeshReport {
        vertex_count,
        face_count: mesh.faces.len(),
        edge_count: adjacency.edge_count(),
        invalid_face_count: mesh.faces.len() - valid.len(),
        boundary_edge_count: adjacency.boundary_edge_count(),
        non_manifold_edge_count: adjacency.non_manifold_edge_count(),
        inconsistent_edge_count: adjacency.inconsistent_edge_count(&valid),
        degenerate_face_count,
        duplicate_face_count: count_duplicate_faces(&valid),
        unreferenced_vertex_count: vertex_count - referenced.len(),
        self_intersection_count,
        is_watertight: adjacency.is_watertight(),
        is_manifold: adjacency.is_manifold(),
        is_inside_out: mesh.signed_volume() < 0.0,
    }
}

/// Check the structural validity expected of an STL-like triangle soup:
/// non-empty, every index in range and every coordinate finite.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate_stl(mesh: &TriangleMesh) -> RepairResult<()> {
    if mesh.is_empty() {
        return Err(RepairError::EmptyMesh);
    }
    if let Some(index) = mesh.vertices.iter().position(|v| !v.is_finite()) {
        return Err(RepairError::NonFiniteVertex { index });
    }
    let vertex_count = mesh.vertices.len();
    for (face, indices) in mesh.faces.iter().enumerate() {
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(RepairError::InvalidIndex {
                face,
                index,
                vertex_count,
            });
        }
    }
    Ok(())
}

/// Whether the surface is closed and two-manifold: every edge, resolved
/// through shared vertex indices, borders exactly two faces.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
/// use mesh_repair::is_manifold;
///
/// let mut cube = unit_cube();
/// assert!(is_manifold(&cube));
/// cube.faces.pop();
/// assert!(!is_manifold(&cube));
/// ```
#[must_use]
pub fn is_manifold(mesh: &TriangleMesh) -> bool {
    validate_stl(mesh).is_ok() && MeshAdjacency::build(&mesh.faces).is_manifold()
}

/// Repeated indices or area below `min_area`. Indices must be in range.
pub(crate) fn is_degenerate_face(mesh: &TriangleMesh, face: [u32; 3], min_area: f64) -> bool {
    let [a, b, c] = face;
    if a == b || b == c || a == c {
        return true;
    }
    let (pa, pb, pc) = (mesh.position(a), mesh.position(b), mesh.position(c));
    (pb - pa).cross(&(pc - pa)).norm() * 0.5 < min_area
}

/// Count faces whose vertex set repeats an earlier face, either winding.
fn count_duplicate_faces(faces: &[[u32; 3]]) -> usize {
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(faces.len());
    faces
        .iter()
        .filter(|f| !seen.insert(sorted_face(**f)))
        .count()
}

/// Vertex set of a face, order-independent.
pub(crate) fn sorted_face(mut face: [u32; 3]) -> [u32; 3] {
    face.sort_unstable();
    face
}
