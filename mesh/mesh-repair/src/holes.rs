//! Hole detection and filling.
//!
//! A hole is a closed loop of boundary edges. Loops are traced along the
//! reversed direction of the faces bordering them, so a patch built from the
//! loop order already matches the surrounding winding.

use hashbrown::{HashMap, HashSet};
use mesh_types::{Point3, TriangleMesh, Vector3, Vertex};
use tracing::{debug, warn};

use crate::adjacency::{face_edges, MeshAdjacency};

/// A closed loop of boundary vertices, ordered so that consecutive pairs are
/// the reversed boundary half-edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    /// Loop vertices, first vertex not repeated at the end.
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges in the loop.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Trace boundary loops.
///
/// Every boundary half-edge belongs to exactly one loop. Where several loops
/// pinch together at a vertex, the walk is split there so each returned loop
/// visits a vertex at most once.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
/// use mesh_repair::{detect_holes, MeshAdjacency};
///
/// let mut cube = unit_cube();
/// cube.faces.truncate(11);
/// let holes = detect_holes(&cube, &MeshAdjacency::build(&cube.faces));
/// assert_eq!(holes.len(), 1);
/// assert_eq!(holes[0].edge_count(), 3);
/// ```
#[must_use]
pub fn detect_holes(mesh: &TriangleMesh, adjacency: &MeshAdjacency) -> Vec<BoundaryLoop> {
    let boundary = adjacency.boundary_edges();
    if boundary.is_empty() {
        return Vec::new();
    }

    // Hole half-edges run opposite to the single face that owns the edge.
    let mut outgoing: HashMap<u32, Vec<u32>> = HashMap::new();
    let mut half_edges = Vec::with_capacity(boundary.len());
    for &(lo, hi) in &boundary {
        let Some(&[face_idx]) = adjacency.faces_for_edge(lo, hi) else {
            continue;
        };
        let Some(face) = mesh.faces.get(face_idx) else {
            continue;
        };
        let edge = if face_edges(*face).contains(&(lo, hi)) {
            (hi, lo)
        } else {
            (lo, hi)
        };
        outgoing.entry(edge.0).or_default().push(edge.1);
        half_edges.push(edge);
    }
    half_edges.sort_unstable();
    for targets in outgoing.values_mut() {
        targets.sort_unstable();
    }

    let mut used: HashSet<(u32, u32)> = HashSet::with_capacity(half_edges.len());
    let mut loops = Vec::new();

    for &(start, first) in &half_edges {
        if !used.insert((start, first)) {
            continue;
        }
        let mut walk = vec![start];
        let mut current = first;
        while current != start {
            if let Some(k) = walk.iter().position(|&v| v == current) {
                // Pinch vertex: peel off the closed sub-loop.
                let sub: Vec<u32> = walk.split_off(k);
                if sub.len() >= 3 {
                    loops.push(BoundaryLoop { vertices: sub });
                }
            }
            walk.push(current);
            let next = outgoing
                .get(&current)
                .and_then(|targets| targets.iter().find(|&&t| !used.contains(&(current, t))))
                .copied();
            let Some(next) = next else {
                walk.clear();
                break;
            };
            used.insert((current, next));
            current = next;
        }
        if walk.len() >= 3 {
            loops.push(BoundaryLoop { vertices: walk });
        }
    }

    debug!(
        boundary_edges = boundary.len(),
        holes = loops.len(),
        "traced boundary loops"
    );
    loops
}

/// Close holes of at most `max_edges` edges with a fan around the loop
/// centroid.
///
/// A loop is only patched when the mesh is edge-manifold and every fan
/// triangle has an area of at least `min_area`; sliver holes are left open.
/// Returns the number of holes filled.
#[allow(clippy::cast_possible_truncation)]
pub fn fill_holes(mesh: &mut TriangleMesh, max_edges: usize, min_area: f64) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    if !adjacency.is_edge_manifold() {
        return 0;
    }

    let mut filled = 0;
    for hole in detect_holes(mesh, &adjacency) {
        if hole.edge_count() > max_edges {
            warn!(edges = hole.edge_count(), max_edges, "hole too large to fill");
            continue;
        }

        let ring: Vec<Point3<f64>> = hole.vertices.iter().map(|&v| mesh.position(v)).collect();
        #[allow(clippy::cast_precision_loss)]
        let centroid = Point3::from(
            ring.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords)
                / ring.len() as f64,
        );

        let patch_ok = (0..ring.len()).all(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
            (b - a).cross(&(centroid - a)).norm() * 0.5 >= min_area
        });
        if !patch_ok {
            debug!(edges = hole.edge_count(), "skipping degenerate hole");
            continue;
        }

        let c = mesh.vertices.len() as u32;
        mesh.vertices.push(Vertex::new(centroid));
        let n = hole.vertices.len();
        for i in 0..n {
            mesh.faces
                .push([hole.vertices[i], hole.vertices[(i + 1) % n], c]);
        }
        filled += 1;
    }

    filled
}
