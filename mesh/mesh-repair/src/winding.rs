//! Face orientation repair.
//!
//! Orientation is propagated face by face across shared edges, one connected
//! component at a time, starting from the lowest face index. Closed
//! components whose enclosed volume comes out negative are then flipped as a
//! whole so normals point outward.

use std::collections::VecDeque;

use mesh_types::TriangleMesh;

use crate::adjacency::{face_edges, MeshAdjacency};

/// Faces grouped by edge connectivity, each group sorted, groups ordered by
/// their lowest face.
#[must_use]
pub fn connected_components(faces: &[[u32; 3]], adjacency: &MeshAdjacency) -> Vec<Vec<usize>> {
    let mut seen = vec![false; faces.len()];
    let mut components = Vec::new();

    for seed in 0..faces.len() {
        if seen[seed] {
            continue;
        }
        seen[seed] = true;
        let mut component = vec![seed];
        let mut queue = VecDeque::from([seed]);
        while let Some(f) = queue.pop_front() {
            for n in adjacency.face_neighbors(faces, f) {
                if !seen[n] {
                    seen[n] = true;
                    component.push(n);
                    queue.push_back(n);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    components
}

/// Make winding consistent across every shared manifold edge.
///
/// Returns the number of faces flipped. Edges shared by more than two faces
/// do not propagate orientation.
pub fn fix_winding_order(mesh: &mut TriangleMesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut visited = vec![false; mesh.faces.len()];
    let mut flipped = 0;

    for seed in 0..mesh.faces.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut queue = VecDeque::from([seed]);

        while let Some(f) = queue.pop_front() {
            let face = mesh.faces[f];
            for (a, b) in face_edges(face) {
                let Some(incident) = adjacency.faces_for_edge(a, b) else {
                    continue;
                };
                if incident.len() != 2 {
                    continue;
                }
                let n = if incident[0] == f { incident[1] } else { incident[0] };
                if visited[n] {
                    continue;
                }
                visited[n] = true;
                // A consistent neighbour walks the shared edge as b -> a.
                if face_edges(mesh.faces[n]).contains(&(a, b)) {
                    mesh.faces[n].swap(1, 2);
                    flipped += 1;
                }
                queue.push_back(n);
            }
        }
    }

    flipped
}

/// Flip closed components that enclose negative volume.
///
/// Returns the number of faces flipped.
pub fn orient_outward(mesh: &mut TriangleMesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut flipped = 0;

    for component in connected_components(&mesh.faces, &adjacency) {
        let closed = component.iter().all(|&f| {
            face_edges(mesh.faces[f])
                .iter()
                .all(|&(a, b)| adjacency.faces_for_edge(a, b).is_some_and(|i| i.len() == 2))
        });
        if !closed {
            continue;
        }

        let volume: f64 = component
            .iter()
            .map(|&f| {
                let [a, b, c] = mesh.faces[f];
                let (a, b, c) = (mesh.position(a), mesh.position(b), mesh.position(c));
                a.coords.dot(&b.coords.cross(&c.coords))
            })
            .sum();

        if volume < 0.0 {
            for &f in &component {
                mesh.faces[f].swap(1, 2);
            }
            flipped += component.len();
        }
    }

    flipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{cuboid, unit_cube, Point3};

    #[test]
    fn single_flipped_face_is_restored() {
        let mut cube = unit_cube();
        cube.faces[5].swap(1, 2);
        assert_eq!(fix_winding_order(&mut cube), 1);
        let adj = MeshAdjacency::build(&cube.faces);
        assert_eq!(adj.inconsistent_edge_count(&cube.faces), 0);
        assert!(cube.signed_volume() > 0.0);
    }

    #[test]
    fn seed_face_wins_then_outward_fix() {
        let mut cube = unit_cube();
        // Propagation follows the flipped face 0 and turns the whole cube
        // inside out.
        cube.faces[0].swap(1, 2);
        assert_eq!(fix_winding_order(&mut cube), 11);
        assert!(cube.is_inside_out());
        assert_eq!(orient_outward(&mut cube), 12);
        assert!(!cube.is_inside_out());
    }

    #[test]
    fn components_are_separated() {
        let mut mesh = unit_cube();
        mesh.merge(&cuboid(Point3::new(3.0, 0.0, 0.0), Point3::new(4.0, 1.0, 1.0)));
        let adj = MeshAdjacency::build(&mesh.faces);
        let comps = connected_components(&mesh.faces, &adj);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0], (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn open_component_is_left_alone() {
        let mut cube = unit_cube();
        cube.faces.truncate(10);
        cube.flip_normals();
        assert_eq!(orient_outward(&mut cube), 0);
    }
}
