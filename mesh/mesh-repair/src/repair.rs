//! In-place mesh repair.
//!
//! [`repair_mesh`] is the only operation in the engine that mutates a mesh.
//! Anything derived from the mesh (an `IndexedMesh`, a slicer) must be
//! rebuilt after a repair.

use hashbrown::{HashMap, HashSet};
use mesh_types::{Point3, TriangleMesh};
use tracing::{debug, info};

use crate::holes::fill_holes;
use crate::validate::{is_degenerate_face, sorted_face};
use crate::winding::{fix_winding_order, orient_outward};

/// Repair thresholds, in mesh units (millimeters).
///
/// # Example
///
/// ```
/// use mesh_repair::RepairParams;
///
/// let params = RepairParams::default()
///     .with_weld_epsilon(1e-4)
///     .with_max_hole_edges(16);
/// assert!(params.fill_holes);
/// ```
#[derive(Debug, Clone)]
pub struct RepairParams {
    /// Vertices closer than this are merged. Default: `1e-6`.
    pub weld_epsilon: f64,

    /// Faces with a smaller area are removed. Default: `1e-12`.
    pub degenerate_area_threshold: f64,

    /// Close boundary loops. Default: `true`.
    pub fill_holes: bool,

    /// Longest boundary loop that is filled. Default: `64`.
    pub max_hole_edges: usize,

    /// Make winding consistent and outward. Default: `true`.
    pub fix_winding: bool,

    /// Drop vertices no face uses. Default: `true`.
    pub remove_unreferenced: bool,

    /// Upper bound on repair passes run while looking for a fixed point.
    /// Default: `4`.
    pub max_passes: usize,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            weld_epsilon: 1e-6,
            degenerate_area_threshold: 1e-12,
            fill_holes: true,
            max_hole_edges: 64,
            fix_winding: true,
            remove_unreferenced: true,
            max_passes: 4,
        }
    }
}

impl RepairParams {
    /// Coarser thresholds for meshes headed to a printer, where features
    /// below a micron cannot be resolved anyway.
    #[must_use]
    pub fn for_printing() -> Self {
        Self {
            weld_epsilon: 1e-4,
            degenerate_area_threshold: 1e-10,
            ..Self::default()
        }
    }

    /// Only remove defects; never add faces or change winding.
    #[must_use]
    pub fn cleanup_only() -> Self {
        Self {
            fill_holes: false,
            fix_winding: false,
            ..Self::default()
        }
    }

    /// Set the weld distance.
    #[must_use]
    pub const fn with_weld_epsilon(mut self, epsilon: f64) -> Self {
        self.weld_epsilon = epsilon;
        self
    }

    /// Set the degenerate-area threshold.
    #[must_use]
    pub const fn with_degenerate_area_threshold(mut self, area: f64) -> Self {
        self.degenerate_area_threshold = area;
        self
    }

    /// Set the largest hole that is filled.
    #[must_use]
    pub const fn with_max_hole_edges(mut self, edges: usize) -> Self {
        self.max_hole_edges = edges;
        self
    }

    /// Enable or disable hole filling.
    #[must_use]
    pub const fn with_fill_holes(mut self, fill: bool) -> Self {
        self.fill_holes = fill;
        self
    }
}

/// What a repair changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Vertex count before repair.
    pub initial_vertices: usize,
    /// Face count before repair.
    pub initial_faces: usize,
    /// Vertex count after repair.
    pub final_vertices: usize,
    /// Face count after repair.
    pub final_faces: usize,
    /// Faces dropped for out-of-range indices.
    pub invalid_removed: usize,
    /// Vertices merged into a neighbour.
    pub vertices_welded: usize,
    /// Zero-area faces removed.
    pub degenerates_removed: usize,
    /// Repeated faces removed.
    pub duplicates_removed: usize,
    /// Boundary loops closed.
    pub holes_filled: usize,
    /// Faces whose winding was reversed.
    pub faces_flipped: usize,
    /// Orphan vertices removed.
    pub unreferenced_removed: usize,
    /// Passes run, the last of which changed nothing unless the limit was hit.
    pub passes: usize,
}

impl RepairSummary {
    /// Whether any step changed the mesh.
    #[must_use]
    pub fn had_changes(&self) -> bool {
        self.change_count() > 0
    }

    fn change_count(&self) -> usize {
        self.invalid_removed
            + self.vertices_welded
            + self.degenerates_removed
            + self.duplicates_removed
            + self.holes_filled
            + self.faces_flipped
            + self.unreferenced_removed
    }

    fn absorb(&mut self, pass: &Self) {
        self.invalid_removed += pass.invalid_removed;
        self.vertices_welded += pass.vertices_welded;
        self.degenerates_removed += pass.degenerates_removed;
        self.duplicates_removed += pass.duplicates_removed;
        self.holes_filled += pass.holes_filled;
        self.faces_flipped += pass.faces_flipped;
        self.unreferenced_removed += pass.unreferenced_removed;
    }
}

impl std::fmt::Display for RepairSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Repair: {} verts ({} welded, {} unreferenced), {} faces ({} invalid, {} degenerate, \
             {} duplicate, {} flipped), {} holes filled in {} passes",
            self.final_vertices,
            self.vertices_welded,
            self.unreferenced_removed,
            self.final_faces,
            self.invalid_removed,
            self.degenerates_removed,
            self.duplicates_removed,
            self.faces_flipped,
            self.holes_filled,
            self.passes
        )
    }
}

/// Drop faces that reference missing vertices.
pub fn remove_invalid_faces(mesh: &mut TriangleMesh) -> usize {
    let vertex_count = mesh.vertices.len();
    let before = mesh.faces.len();
    mesh.faces
        .retain(|f| f.iter().all(|&i| (i as usize) < vertex_count));
    before - mesh.faces.len()
}

/// Remove faces with repeated indices or an area below `area_threshold`.
///
/// Indices must be in range.
pub fn remove_degenerate_triangles(mesh: &mut TriangleMesh, area_threshold: f64) -> usize {
    let before = mesh.faces.len();
    let keep: Vec<bool> = mesh
        .faces
        .iter()
        .map(|f| !is_degenerate_face(mesh, *f, area_threshold))
        .collect();
    let mut keep = keep.into_iter();
    mesh.faces.retain(|_| keep.next().unwrap_or(true));
    before - mesh.faces.len()
}

/// Merge referenced vertices closer than `epsilon`.
///
/// Each vertex is merged into the lowest-indexed vertex within range, so the
/// result does not depend on hashing order. Faces collapsing onto a repeated
/// index are removed. Returns the number of vertices merged away.
#[allow(clippy::cast_possible_truncation)]
pub fn weld_vertices(mesh: &mut TriangleMesh, epsilon: f64) -> usize {
    if mesh.vertices.is_empty() || epsilon <= 0.0 {
        return 0;
    }

    let referenced: HashSet<u32> = mesh.faces.iter().flatten().copied().collect();
    let cell_size = epsilon * 2.0;
    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if referenced.contains(&idx) {
            grid.entry(cell_of(&vertex.position, cell_size))
                .or_default()
                .push(idx);
        }
    }

    let mut remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut merged = 0;

    for idx in 0..mesh.vertices.len() as u32 {
        if remap[idx as usize] != idx || !referenced.contains(&idx) {
            continue;
        }
        let p = mesh.vertices[idx as usize].position;
        let (cx, cy, cz) = cell_of(&p, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || remap[other as usize] != other {
                            continue;
                        }
                        if (mesh.vertices[other as usize].position - p).norm() < epsilon {
                            remap[other as usize] = idx;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    for face in &mut mesh.faces {
        for i in face.iter_mut() {
            *i = remap[*i as usize];
        }
    }
    mesh.faces
        .retain(|&[a, b, c]| a != b && b != c && a != c);

    debug!(merged, epsilon, "welded vertices");
    merged
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of(p: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

/// Compact the vertex array to the vertices faces actually use.
#[allow(clippy::cast_possible_truncation)]
pub fn remove_unreferenced_vertices(mesh: &mut TriangleMesh) -> usize {
    let before = mesh.vertices.len();
    let mut used = vec![false; before];
    for &i in mesh.faces.iter().flatten() {
        if let Some(slot) = used.get_mut(i as usize) {
            *slot = true;
        }
    }
    if used.iter().all(|&u| u) {
        return 0;
    }

    let mut remap = vec![u32::MAX; before];
    let mut vertices = Vec::with_capacity(before);
    for (old, vertex) in mesh.vertices.iter().enumerate() {
        if used[old] {
            remap[old] = vertices.len() as u32;
            vertices.push(*vertex);
        }
    }
    for face in &mut mesh.faces {
        for i in face.iter_mut() {
            *i = remap[*i as usize];
        }
    }
    mesh.vertices = vertices;

    before - mesh.vertices.len()
}

/// Remove faces whose vertex set repeats an earlier face, in either winding.
pub fn remove_duplicate_faces(mesh: &mut TriangleMesh) -> usize {
    let before = mesh.faces.len();
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(before);
    mesh.faces.retain(|f| seen.insert(sorted_face(*f)));
    before - mesh.faces.len()
}

/// Repair a mesh in place.
///
/// Each pass removes invalid, welded-away, degenerate and duplicate faces,
/// fills small holes, fixes winding and drops orphan vertices. Passes repeat
/// until one changes nothing, so repairing a repaired mesh is a no-op.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
/// use mesh_repair::{repair_mesh, RepairParams};
///
/// let mut cube = unit_cube();
/// cube.faces[4].swap(1, 2);
/// cube.faces.push(cube.faces[0]);
///
/// let summary = repair_mesh(&mut cube, &RepairParams::default());
/// assert_eq!(summary.duplicates_removed, 1);
/// assert_eq!(summary.faces_flipped, 1);
///
/// let again = repair_mesh(&mut cube, &RepairParams::default());
/// assert!(!again.had_changes());
/// ```
pub fn repair_mesh(mesh: &mut TriangleMesh, params: &RepairParams) -> RepairSummary {
    let mut summary = RepairSummary {
        initial_vertices: mesh.vertices.len(),
        initial_faces: mesh.faces.len(),
        ..RepairSummary::default()
    };

    for _ in 0..params.max_passes.max(1) {
        let pass = repair_pass(mesh, params);
        summary.passes += 1;
        summary.absorb(&pass);
        if !pass.had_changes() {
            break;
        }
    }

    summary.final_vertices = mesh.vertices.len();
    summary.final_faces = mesh.faces.len();
    info!(
        vertices = summary.final_vertices,
        faces = summary.final_faces,
        passes = summary.passes,
        changed = summary.had_changes(),
        "mesh repaired"
    );
    summary
}

fn repair_pass(mesh: &mut TriangleMesh, params: &RepairParams) -> RepairSummary {
    let mut pass = RepairSummary {
        invalid_removed: remove_invalid_faces(mesh),
        ..RepairSummary::default()
    };
    pass.vertices_welded = weld_vertices(mesh, params.weld_epsilon);
    pass.degenerates_removed = remove_degenerate_triangles(mesh, params.degenerate_area_threshold);
    pass.duplicates_removed = remove_duplicate_faces(mesh);
    if params.fill_holes {
        pass.holes_filled = fill_holes(
            mesh,
            params.max_hole_edges,
            params.degenerate_area_threshold,
        );
    }
    if params.fix_winding {
        pass.faces_flipped = fix_winding_order(mesh) + orient_outward(mesh);
    }
    if params.remove_unreferenced {
        pass.unreferenced_removed = remove_unreferenced_vertices(mesh);
    }
    pass
}

/// Whether [`repair_mesh`] with default parameters would change the mesh.
///
/// A pure query: the mesh is not touched.
#[must_use]
pub fn needs_repair(mesh: &TriangleMesh) -> bool {
    needs_repair_with(mesh, &RepairParams::default())
}

/// Whether [`repair_mesh`] with `params` would change the mesh.
#[must_use]
pub fn needs_repair_with(mesh: &TriangleMesh, params: &RepairParams) -> bool {
    let mut scratch = mesh.clone();
    repair_pass(&mut scratch, params).had_changes()
}
