//! Shared-vertex adjacency.
//!
//! Manifoldness and winding checks need to know which faces meet at each
//! edge. [`MeshAdjacency`] is built on demand from a face list and is never
//! stored inside the mesh, so it cannot go stale after a repair.

use hashbrown::HashMap;
use smallvec::SmallVec;

/// Faces incident to one undirected edge. Two for a manifold interior edge.
type EdgeFaces = SmallVec<[usize; 2]>;

/// Edge-to-face and vertex-to-face incidence for a face list.
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Undirected edge `(lo, hi)` to incident faces, in face order.
    edge_to_faces: HashMap<(u32, u32), EdgeFaces>,
    /// Vertex to incident faces, in face order.
    vertex_to_faces: HashMap<u32, Vec<usize>>,
}

impl MeshAdjacency {
    /// Build adjacency from triangle faces.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_repair::MeshAdjacency;
    ///
    /// let adj = MeshAdjacency::build(&[[0, 1, 2], [1, 3, 2]]);
    /// assert_eq!(adj.boundary_edge_count(), 4);
    /// assert_eq!(adj.faces_for_edge(2, 1), Some(&[0, 1][..]));
    /// ```
    #[must_use]
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), EdgeFaces> =
            HashMap::with_capacity(faces.len() * 3 / 2);
        let mut vertex_to_faces: HashMap<u32, Vec<usize>> = HashMap::new();

        for (face_idx, face) in faces.iter().enumerate() {
            for &v in face {
                vertex_to_faces.entry(v).or_default().push(face_idx);
            }
            for (a, b) in face_edges(*face) {
                edge_to_faces
                    .entry(undirected(a, b))
                    .or_default()
                    .push(face_idx);
            }
        }

        Self {
            edge_to_faces,
            vertex_to_faces,
        }
    }

    /// Faces sharing the edge `v0`-`v1`, in either direction.
    #[must_use]
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[usize]> {
        self.edge_to_faces
            .get(&undirected(v0, v1))
            .map(SmallVec::as_slice)
    }

    /// Faces touching vertex `v`.
    #[must_use]
    pub fn faces_for_vertex(&self, v: u32) -> &[usize] {
        self.vertex_to_faces.get(&v).map_or(&[], Vec::as_slice)
    }

    /// Undirected edges with exactly one incident face, sorted.
    #[must_use]
    pub fn boundary_edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<_> = self
            .edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&edge, _)| edge)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Number of edges with one incident face.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() == 1).count()
    }

    /// Number of edges with more than two incident faces.
    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() > 2).count()
    }

    /// No edge is shared by more than two faces.
    #[must_use]
    pub fn is_edge_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|f| f.len() <= 2)
    }

    /// Every edge has at least two faces.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.edge_to_faces.values().all(|f| f.len() >= 2)
    }

    /// Every edge has exactly two faces: a closed two-manifold surface.
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        !self.edge_to_faces.is_empty() && self.edge_to_faces.values().all(|f| f.len() == 2)
    }

    /// Number of distinct undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }

    /// Number of vertices referenced by at least one face.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_to_faces.len()
    }

    /// Faces sharing an edge with `face_idx`, sorted and deduplicated.
    #[must_use]
    pub fn face_neighbors(&self, faces: &[[u32; 3]], face_idx: usize) -> SmallVec<[usize; 3]> {
        let mut out = SmallVec::new();
        let Some(face) = faces.get(face_idx) else {
            return out;
        };
        for (a, b) in face_edges(*face) {
            if let Some(incident) = self.faces_for_edge(a, b) {
                out.extend(incident.iter().copied().filter(|&f| f != face_idx));
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Count manifold edges whose two faces traverse them in the same
    /// direction, which means one of the faces is flipped.
    #[must_use]
    pub fn inconsistent_edge_count(&self, faces: &[[u32; 3]]) -> usize {
        self.edge_to_faces
            .iter()
            .filter(|(_, incident)| incident.len() == 2)
            .filter(|(edge, incident)| {
                let (lo, hi) = **edge;
                let forward = |f: usize| {
                    faces
                        .get(f)
                        .is_some_and(|face| face_edges(*face).contains(&(lo, hi)))
                };
                forward(incident[0]) == forward(incident[1])
            })
            .count()
    }
}

/// Directed edges of a face in winding order.
#[inline]
pub(crate) fn face_edges(face: [u32; 3]) -> [(u32, u32); 3] {
    [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])]
}

#[inline]
fn undirected(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 { (v0, v1) } else { (v1, v0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::unit_cube;

    #[test]
    fn cube_is_closed_manifold() {
        let cube = unit_cube();
        let adj = MeshAdjacency::build(&cube.faces);
        assert_eq!(adj.edge_count(), 18);
        assert_eq!(adj.boundary_edge_count(), 0);
        assert!(adj.is_manifold());
        assert!(adj.is_watertight());
        assert_eq!(adj.inconsistent_edge_count(&cube.faces), 0);
    }

    #[test]
    fn open_fan_has_boundary() {
        let faces = [[0, 1, 2], [0, 2, 3]];
        let adj = MeshAdjacency::build(&faces);
        assert_eq!(adj.boundary_edges(), vec![(0, 1), (0, 3), (1, 2), (2, 3)]);
        assert!(!adj.is_manifold());
        assert!(adj.is_edge_manifold());
    }

    #[test]
    fn three_faces_on_an_edge() {
        let faces = [[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        let adj = MeshAdjacency::build(&faces);
        assert_eq!(adj.non_manifold_edge_count(), 1);
        assert!(!adj.is_edge_manifold());
    }

    #[test]
    fn flipped_face_is_inconsistent() {
        let mut cube = unit_cube();
        cube.faces[3].swap(1, 2);
        let adj = MeshAdjacency::build(&cube.faces);
        assert_eq!(adj.inconsistent_edge_count(&cube.faces), 3);
    }

    #[test]
    fn neighbors_are_sorted() {
        let cube = unit_cube();
        let adj = MeshAdjacency::build(&cube.faces);
        let n = adj.face_neighbors(&cube.faces, 0);
        assert_eq!(n.len(), 3);
        assert!(n.windows(2).all(|w| w[0] < w[1]));
    }
}
