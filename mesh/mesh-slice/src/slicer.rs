//! Horizontal mesh slicing.
//!
//! Cuts a triangle mesh with planes `z = const` and returns one region set
//! per plane.

// Layer counts don't overflow in practice
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::sync::atomic::{AtomicUsize, Ordering};

use hashbrown::HashMap;
use mesh_types::{JobControl, MeshTopology, NoControl, Point2, Point3, Triangle, TriangleMesh};
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::clip::{closing, union_ex};
use crate::error::{SliceError, SliceResult};
use crate::polygon::{ExPolygon, ExPolygons, Polygon};

/// Points closer than this are merged while chaining loops.
const POINT_EPSILON: f64 = 1e-9;

/// Z values from `start` to `stop` inclusive, `stride` apart.
///
/// Empty when `stride` is not positive or `stop < start`. Values are
/// computed as `start + i * stride`, so rounding does not accumulate.
///
/// # Example
///
/// ```
/// use mesh_slice::grid;
///
/// let zs = grid(0.0, 1.0, 0.25);
/// assert_eq!(zs.len(), 5);
/// assert!((zs[4] - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn grid(start: f64, stop: f64, stride: f64) -> Vec<f64> {
    if stride.is_nan() || stride <= 0.0 || !start.is_finite() || !stop.is_finite() || stop < start {
        return Vec::new();
    }
    // Tolerate `stop` landing a hair short of a grid step.
    let steps = ((stop - start) / stride + 1e-9).floor() as usize;
    (0..=steps).map(|i| (i as f64).mul_add(stride, start)).collect()
}

/// Bit pattern of a position; exact equality, `-0.0 == 0.0`.
type VertexKey = [u64; 3];

fn vertex_key(p: &Point3<f64>) -> VertexKey {
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

/// An edge identified by its endpoint positions, so meshes without shared
/// vertices chain the same as indexed ones.
type EdgeKey = (VertexKey, VertexKey);

/// One triangle's cut: solid on the left walking `start -> end`.
struct Segment {
    start: Point2<f64>,
    end: Point2<f64>,
    start_key: EdgeKey,
    end_key: EdgeKey,
}

/// Reusable slicer over a mesh snapshot.
///
/// Triangles are sorted by their lowest Z once, so each plane only visits
/// the triangles that can reach it.
///
/// # Example
///
/// ```
/// use mesh_slice::{grid, MeshSlicer};
/// use mesh_types::{cube, NoControl};
///
/// let slicer = MeshSlicer::new(&cube(10.0));
/// let layers = slicer.slice(&grid(0.5, 9.5, 1.0), 0.0, &NoControl).unwrap();
/// assert_eq!(layers.len(), 10);
/// assert!(layers.iter().all(|l| l.len() == 1));
/// ```
#[derive(Debug, Clone)]
pub struct MeshSlicer {
    triangles: Vec<Triangle>,
    min_z: Vec<f64>,
}

impl MeshSlicer {
    /// Snapshot `mesh`. Faces with out-of-range indices are ignored.
    #[must_use]
    pub fn new(mesh: &TriangleMesh) -> Self {
        let mut triangles: Vec<Triangle> = mesh.triangles().collect();
        triangles.sort_by(|a, b| a.min_z().total_cmp(&b.min_z()));
        let min_z = triangles.iter().map(Triangle::min_z).collect();
        Self { triangles, min_z }
    }

    /// Number of triangles considered.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    /// Slice at every height in `zs`.
    ///
    /// Returns one region set per height, in input order; heights outside
    /// the mesh give empty sets. Each layer is closed with
    /// `closing_radius` to drop slivers and merge near-coincident edges.
    ///
    /// # Errors
    ///
    /// - [`SliceError::InvalidClosingRadius`] for a negative or non-finite
    ///   radius.
    /// - [`SliceError::Cancelled`] when `control` asks to stop.
    pub fn slice(
        &self,
        zs: &[f64],
        closing_radius: f64,
        control: &dyn JobControl,
    ) -> SliceResult<Vec<ExPolygons>> {
        if !closing_radius.is_finite() || closing_radius < 0.0 {
            return Err(SliceError::InvalidClosingRadius(closing_radius));
        }

        info!(
            layers = zs.len(),
            faces = self.triangles.len(),
            closing_radius,
            "Starting mesh slicing"
        );

        let done = AtomicUsize::new(0);
        let total = zs.len().max(1) as f64;
        let layers = zs
            .par_iter()
            .map(|&z| {
                if control.should_cancel() {
                    return Err(SliceError::Cancelled);
                }
                let layer = self.slice_at(z, closing_radius);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                control.report_progress(finished as f64 / total);
                Ok(layer)
            })
            .collect::<SliceResult<Vec<_>>>()?;

        info!(layers = layers.len(), "Slicing complete");
        Ok(layers)
    }

    /// Slice a single plane.
    #[must_use]
    pub fn slice_at(&self, z: f64, closing_radius: f64) -> ExPolygons {
        let loops = chain_segments(self.segments_at(z));
        if loops.is_empty() {
            return Vec::new();
        }
        let regions = assemble_regions(loops);
        let closed = closing(&regions, closing_radius);
        debug!(z, islands = closed.len(), "Sliced layer");
        closed
    }

    fn segments_at(&self, z: f64) -> Vec<Segment> {
        // A vertex exactly on the plane counts as above it.
        let end = self.min_z.partition_point(|&m| m < z);
        self.triangles[..end]
            .iter()
            .filter(|t| t.max_z() >= z)
            .filter_map(|t| cut_triangle(t, z))
            .collect()
    }
}

/// Slice `mesh` at every height in `zs` without progress reporting.
///
/// # Errors
///
/// [`SliceError::InvalidClosingRadius`] for a negative or non-finite radius.
///
/// # Example
///
/// ```
/// use mesh_slice::{area, grid, slice_mesh};
/// use mesh_types::cube;
///
/// let layers = slice_mesh(&cube(20.0), &grid(0.05, 19.95, 0.05), 0.005).unwrap();
/// assert!((area(&layers[100]) - 400.0).abs() < 1e-3);
/// ```
pub fn slice_mesh(
    mesh: &TriangleMesh,
    zs: &[f64],
    closing_radius: f64,
) -> SliceResult<Vec<ExPolygons>> {
    MeshSlicer::new(mesh).slice(zs, closing_radius, &NoControl)
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn edge_key(a: &Point3<f64>, b: &Point3<f64>) -> (EdgeKey, Point3<f64>, Point3<f64>) {
    let (ka, kb) = (vertex_key(a), vertex_key(b));
    if ka <= kb {
        ((ka, kb), *a, *b)
    } else {
        ((kb, ka), *b, *a)
    }
}

/// Crossing of an edge with the plane, computed from the canonical endpoint
/// order so both triangles sharing the edge get identical bits.
fn crossing(a: &Point3<f64>, b: &Point3<f64>, z: f64) -> (EdgeKey, Point2<f64>) {
    let (key, p, q) = edge_key(a, b);
    let t = (z - p.z) / (q.z - p.z);
    let x = (q.x - p.x).mul_add(t, p.x);
    let y = (q.y - p.y).mul_add(t, p.y);
    (key, Point2::new(x, y))
}

fn cut_triangle(tri: &Triangle, z: f64) -> Option<Segment> {
    let v = tri.vertices();
    let above = v.map(|p| p.z >= z);

    let mut down = None;
    let mut up = None;
    for i in 0..3 {
        let j = (i + 1) % 3;
        match (above[i], above[j]) {
            (true, false) => down = Some(crossing(&v[i], &v[j], z)),
            (false, true) => up = Some(crossing(&v[i], &v[j], z)),
            _ => {}
        }
    }

    let ((start_key, start), (end_key, end)) = (down?, up?);
    Some(Segment {
        start,
        end,
        start_key,
        end_key,
    })
}

/// Link segments into loops through their shared edges.
///
/// Open chains (from holes in the mesh) are kept when they still enclose
/// something.
fn chain_segments(segments: Vec<Segment>) -> Vec<Polygon> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut by_start: HashMap<EdgeKey, SmallVec<[usize; 2]>> = HashMap::with_capacity(segments.len());
    for (i, s) in segments.iter().enumerate() {
        by_start.entry(s.start_key).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();
    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let mut points = vec![segments[first].start];
        let mut current = first;
        loop {
            points.push(segments[current].end);
            let next = by_start
                .get(&segments[current].end_key)
                .and_then(|c| c.iter().copied().find(|&k| !used[k]));
            match next {
                Some(k) => {
                    used[k] = true;
                    current = k;
                }
                None => break,
            }
        }

        let mut ring = Polygon::new(points);
        ring.dedup(POINT_EPSILON);
        if !ring.is_empty() && ring.area() > POINT_EPSILON {
            loops.push(ring);
        }
    }
    loops
}

/// Nest clockwise loops (holes) into the smallest counter-clockwise loop
/// containing them and merge the result with the non-zero rule.
fn assemble_regions(loops: Vec<Polygon>) -> ExPolygons {
    let (contours, holes): (Vec<Polygon>, Vec<Polygon>) =
        loops.into_iter().partition(Polygon::is_ccw);

    let mut regions: Vec<ExPolygon> = contours.into_iter().map(ExPolygon::new).collect();
    let areas: Vec<f64> = regions.iter().map(|r| r.contour.area()).collect();

    for hole in holes {
        let corner = hole.points[0];
        let container = regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.contour.contains(&corner))
            .min_by(|(a, _), (b, _)| areas[*a].total_cmp(&areas[*b]))
            .map(|(i, _)| i);
        if let Some(i) = container {
            regions[i].holes.push(hole);
        }
    }
    union_ex(&regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::area;
    use mesh_types::{cube, cuboid, FnControl, Vertex};
    use std::sync::atomic::AtomicBool;

    /// 20mm cube with a 10mm square through-hole along Z.
    fn cube_with_hole() -> TriangleMesh {
        let outer = [(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)];
        let inner = [(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)];
        let mut mesh = TriangleMesh::new();
        for z in [0.0, 20.0] {
            for (x, y) in outer.iter().chain(inner.iter()) {
                mesh.vertices.push(Vertex::from_coords(*x, *y, z));
            }
        }
        // Indices: bottom outer 0..4, bottom inner 4..8, top outer 8..12, top inner 12..16.
        for i in 0..4u32 {
            let j = (i + 1) % 4;
            let (ob, ib, ot, it) = (i, 4 + i, 8 + i, 12 + i);
            let (obn, ibn, otn, itn) = (j, 4 + j, 8 + j, 12 + j);
            mesh.faces.push([ot, otn, itn]);
            mesh.faces.push([ot, itn, it]);
            mesh.faces.push([ob, ibn, obn]);
            mesh.faces.push([ob, ib, ibn]);
            mesh.faces.push([ob, obn, otn]);
            mesh.faces.push([ob, otn, ot]);
            mesh.faces.push([ib, itn, ibn]);
            mesh.faces.push([ib, it, itn]);
        }
        mesh
    }

    #[test]
    fn test_grid() {
        assert_eq!(grid(0.0, 1.0, 0.1).len(), 11);
        assert_eq!(grid(2.0, 2.0, 0.1), vec![2.0]);
        assert!(grid(1.0, 0.0, 0.1).is_empty());
        assert!(grid(0.0, 1.0, 0.0).is_empty());
        assert!(grid(0.0, 1.0, -0.1).is_empty());
    }

    #[test]
    fn test_cube_layers() {
        let mesh = cuboid(Point3::origin(), Point3::new(10.0, 10.0, 10.0));
        let layers = slice_mesh(&mesh, &[-1.0, 0.5, 5.0, 9.99, 11.0], 0.0).unwrap();
        assert_eq!(layers.len(), 5);
        assert!(layers[0].is_empty());
        assert!(layers[4].is_empty());
        for layer in &layers[1..4] {
            assert_eq!(layer.len(), 1);
            assert!(layer[0].holes.is_empty());
            assert!(layer[0].contour.is_ccw());
            assert!((area(layer) - 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hole_is_nested() {
        let layers = slice_mesh(&cube_with_hole(), &[10.0], 0.005).unwrap();
        assert_eq!(layers[0].len(), 1);
        assert_eq!(layers[0][0].holes.len(), 1);
        assert!(!layers[0][0].holes[0].is_ccw());
        assert!((area(&layers[0]) - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_triangle_soup_chains_like_indexed() {
        let indexed = cube(10.0);
        let mut soup = TriangleMesh::new();
        for t in indexed.triangles() {
            soup.push_triangle(t.v0, t.v1, t.v2);
        }
        let a = slice_mesh(&indexed, &[3.0], 0.0).unwrap();
        let b = slice_mesh(&soup, &[3.0], 0.0).unwrap();
        assert!((area(&a[0]) - area(&b[0])).abs() < 1e-9);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_plane_through_vertices() {
        // Vertices on the plane count as above, so slicing exactly at the
        // bottom yields nothing and exactly at the top yields the outline.
        let mesh = cuboid(Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        let layers = slice_mesh(&mesh, &[0.0, 2.0], 0.0).unwrap();
        assert!(layers[0].is_empty());
        assert!((area(&layers[1]) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_separate_islands() {
        let mut mesh = cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        mesh.merge(&cuboid(Point3::new(3.0, 0.0, 0.0), Point3::new(4.0, 1.0, 1.0)));
        let layers = slice_mesh(&mesh, &[0.5], 0.005).unwrap();
        assert_eq!(layers[0].len(), 2);
    }

    #[test]
    fn test_invalid_closing_radius() {
        let slicer = MeshSlicer::new(&cube(1.0));
        assert_eq!(
            slicer.slice(&[0.5], -1.0, &NoControl).unwrap_err(),
            SliceError::InvalidClosingRadius(-1.0)
        );
        assert!(slicer.slice(&[0.5], f64::NAN, &NoControl).is_err());
    }

    #[test]
    fn test_cancellation() {
        let cancel = AtomicBool::new(true);
        let slicer = MeshSlicer::new(&cube(1.0));
        let result = slicer.slice(&grid(0.0, 1.0, 0.1), 0.0, &cancel);
        assert_eq!(result.unwrap_err(), SliceError::Cancelled);
    }

    #[test]
    fn test_progress_reaches_one() {
        let last = std::sync::Mutex::new(0.0_f64);
        let control = FnControl::new(
            |p| {
                let mut l = last.lock().unwrap();
                *l = l.max(p);
            },
            || false,
        );
        let slicer = MeshSlicer::new(&cube(1.0));
        slicer.slice(&grid(0.05, 0.95, 0.1), 0.0, &control).unwrap();
        assert!((*last.lock().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_mesh() {
        let layers = slice_mesh(&TriangleMesh::new(), &[0.0, 1.0], 0.01).unwrap();
        assert_eq!(layers.len(), 2);
        assert!(layers.iter().all(Vec::is_empty));
    }
}
