//! Automatic support point placement.
//!
//! Points come from two sources:
//!
//! - **Layer analysis.** For every slice the area not resting on the layer
//!   below (grown by the overhang tolerance) is unsupported. Regions with
//!   nothing at all underneath are new islands. Unsupported areas are
//!   sampled on a regular grid and each sample is dropped onto the surface.
//! - **Apex seeding.** Vertices lower than all their neighbours start an
//!   island on their own, whatever the layer spacing.
//!
//! A point is only kept when no kept point lies within the configured
//! spacing.

// Layer and cell indices stay far below 2^52
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

use std::sync::atomic::{AtomicUsize, Ordering};

use hashbrown::{HashMap, HashSet};
use mesh_index::IndexedMesh;
use mesh_slice::{
    area, bounding_box, contains_point, difference, interior_point, intersection, offset,
    ExPolygon, ExPolygons,
};
use mesh_types::{JobControl, Point2, Point3, Vector3};
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::error::{SupportError, SupportResult};

/// Unsupported pieces smaller than this (mm²) are slivers from offsetting.
const MIN_ISLAND_AREA: f64 = 1e-4;

/// An anchor where the support tree touches the model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SupportPoint {
    /// Position on the model surface.
    pub pos: Point3<f64>,
    /// Radius of the head touching the model here.
    pub head_front_radius: f64,
    /// The point supports a region with nothing below it.
    pub is_new_island: bool,
}

impl SupportPoint {
    /// A point supporting an overhang of an existing island.
    #[must_use]
    pub const fn new(pos: Point3<f64>, head_front_radius: f64) -> Self {
        Self {
            pos,
            head_front_radius,
            is_new_island: false,
        }
    }
}

/// Placement parameters for [`AutoSupports`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutoSupportConfig {
    /// Diameter of the head tip, in mm. Default: `0.4`.
    pub head_diameter: f64,
    /// Point density multiplier. Default: `1.0`.
    pub density_relative: f64,
    /// Smallest distance between two points, in mm. Default: `1.0`.
    pub minimal_distance: f64,
    /// Surfaces steeper than this from the horizontal need no support.
    /// Default: 45°.
    pub overhang_angle: f64,
}

impl Default for AutoSupportConfig {
    fn default() -> Self {
        Self {
            head_diameter: 0.4,
            density_relative: 1.0,
            minimal_distance: 1.0,
            overhang_angle: std::f64::consts::FRAC_PI_4,
        }
    }
}

impl AutoSupportConfig {
    /// Set the head diameter.
    #[must_use]
    pub const fn with_head_diameter(mut self, diameter: f64) -> Self {
        self.head_diameter = diameter;
        self
    }

    /// Set the density multiplier.
    #[must_use]
    pub const fn with_density(mut self, density: f64) -> Self {
        self.density_relative = density;
        self
    }

    /// Set the minimal point distance.
    #[must_use]
    pub const fn with_minimal_distance(mut self, distance: f64) -> Self {
        self.minimal_distance = distance;
        self
    }

    /// Distance kept between points.
    #[must_use]
    pub fn spacing(&self) -> f64 {
        self.head_diameter.max(self.minimal_distance) / self.density_relative
    }

    /// Check the parameters.
    ///
    /// # Errors
    ///
    /// [`SupportError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> SupportResult<()> {
        for (field, value) in [
            ("head_diameter", self.head_diameter),
            ("density_relative", self.density_relative),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SupportError::invalid(field, value, "finite and > 0"));
            }
        }
        if !(self.minimal_distance.is_finite() && self.minimal_distance >= 0.0) {
            return Err(SupportError::invalid(
                "minimal_distance",
                self.minimal_distance,
                "finite and >= 0",
            ));
        }
        if !(self.overhang_angle > 0.0 && self.overhang_angle < std::f64::consts::FRAC_PI_2) {
            return Err(SupportError::invalid(
                "overhang_angle",
                self.overhang_angle,
                "in (0, pi/2)",
            ));
        }
        Ok(())
    }
}

/// Part of a layer that needs support.
#[derive(Debug)]
struct Overhang {
    region: ExPolygon,
    new_island: bool,
}

/// Support points for a sliced model.
///
/// # Example
///
/// ```
/// use mesh_index::IndexedMesh;
/// use mesh_slice::{grid, slice_mesh};
/// use mesh_types::{cube, NoControl};
/// use sla_supports::{AutoSupportConfig, AutoSupports};
///
/// let mesh = cube(4.0);
/// let heights = grid(-1.0, 4.0, 0.05);
/// let slices = slice_mesh(&mesh, &heights, 0.005).unwrap();
/// let index = IndexedMesh::new(&mesh).unwrap();
///
/// let auto = AutoSupports::new(&index, &slices, &heights, &AutoSupportConfig::default(), &NoControl)
///     .unwrap();
/// // The whole bottom face hangs in the air.
/// assert!(!auto.output().is_empty());
/// assert!(auto.output().iter().all(|p| p.pos.z.abs() < 1e-9));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AutoSupports {
    points: Vec<SupportPoint>,
}

impl AutoSupports {
    /// Analyze `slices`, taken at `heights`, and place points on `mesh`.
    ///
    /// Layer analysis runs in parallel, placement runs in layer order, so
    /// the result does not depend on the thread count.
    ///
    /// # Errors
    ///
    /// - [`SupportError::InvalidConfig`] for a bad `config`.
    /// - [`SupportError::LayerMismatch`] when the two slices differ in length.
    /// - [`SupportError::Cancelled`] when `control` asks to stop.
    pub fn new(
        mesh: &IndexedMesh,
        slices: &[ExPolygons],
        heights: &[f64],
        config: &AutoSupportConfig,
        control: &dyn JobControl,
    ) -> SupportResult<Self> {
        config.validate()?;
        if slices.len() != heights.len() {
            return Err(SupportError::LayerMismatch {
                slices: slices.len(),
                heights: heights.len(),
            });
        }
        if mesh.is_empty() {
            return Ok(Self::default());
        }

        info!(
            layers = slices.len(),
            spacing = config.spacing(),
            "Placing support points"
        );

        let overhangs = find_overhangs(slices, heights, config, control)?;

        let mut placer = Placer::new(config);
        for apex in local_minima(mesh) {
            placer.try_add(SupportPoint {
                pos: apex,
                head_front_radius: config.head_diameter / 2.0,
                is_new_island: true,
            });
        }
        debug!(points = placer.points.len(), "Seeded surface minima");

        let total = overhangs.len().max(1) as f64;
        for (k, layer) in overhangs.iter().enumerate() {
            if control.should_cancel() {
                return Err(SupportError::Cancelled);
            }
            let dz = layer_thickness(heights, k);
            for overhang in layer {
                for xy in sample_region(&overhang.region, config) {
                    if let Some(pos) = drop_to_surface(mesh, xy, heights[k], dz) {
                        placer.try_add(SupportPoint {
                            pos,
                            head_front_radius: config.head_diameter / 2.0,
                            is_new_island: overhang.new_island,
                        });
                    }
                }
            }
            control.report_progress(0.5 + 0.5 * (k + 1) as f64 / total);
        }

        info!(points = placer.points.len(), "Support points placed");
        Ok(Self {
            points: placer.points,
        })
    }

    /// The placed points.
    #[must_use]
    pub fn output(&self) -> &[SupportPoint] {
        &self.points
    }

    /// Move the points out.
    #[must_use]
    pub fn into_output(self) -> Vec<SupportPoint> {
        self.points
    }
}

/// Drop points within `tolerance` of `ground_level`, bounds included.
///
/// Used when the model sits directly on the pad: anything that low is
/// carried by the pad itself.
pub fn remove_bottom_points(points: &mut Vec<SupportPoint>, ground_level: f64, tolerance: f64) {
    let before = points.len();
    points.retain(|p| (p.pos.z - ground_level).abs() > tolerance);
    debug!(removed = before - points.len(), "Removed bottom points");
}

// ============================================================================
// Layer analysis
// ============================================================================

fn layer_thickness(heights: &[f64], k: usize) -> f64 {
    match (k, heights.len()) {
        (_, 0 | 1) => 1.0,
        (0, _) => heights[1] - heights[0],
        _ => heights[k] - heights[k - 1],
    }
}

fn find_overhangs(
    slices: &[ExPolygons],
    heights: &[f64],
    config: &AutoSupportConfig,
    control: &dyn JobControl,
) -> SupportResult<Vec<Vec<Overhang>>> {
    let done = AtomicUsize::new(0);
    let total = slices.len().max(1) as f64;
    let slope = config.overhang_angle.tan();

    (0..slices.len())
        .into_par_iter()
        .map(|k| {
            if control.should_cancel() {
                return Err(SupportError::Cancelled);
            }
            let below: &[ExPolygon] = if k == 0 { &[] } else { &slices[k - 1] };
            let tolerance = layer_thickness(heights, k) / slope;
            let layer = layer_overhangs(&slices[k], below, tolerance);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            control.report_progress(0.5 * finished as f64 / total);
            Ok(layer)
        })
        .collect()
}

fn layer_overhangs(layer: &[ExPolygon], below: &[ExPolygon], tolerance: f64) -> Vec<Overhang> {
    let grown = offset(below, tolerance);
    let mut out = Vec::new();
    for region in layer {
        let single = std::slice::from_ref(region);
        let touches = area(&intersection(single, below)) > MIN_ISLAND_AREA;
        if !touches {
            out.push(Overhang {
                region: region.clone(),
                new_island: true,
            });
            continue;
        }
        out.extend(
            difference(single, &grown)
                .into_iter()
                .filter(|piece| piece.area() > MIN_ISLAND_AREA)
                .map(|region| Overhang {
                    region,
                    new_island: false,
                }),
        );
    }
    out
}

/// Grid samples inside `region` shrunk by the head radius, or a single
/// interior point when the region is too thin for the grid.
fn sample_region(region: &ExPolygon, config: &AutoSupportConfig) -> Vec<Point2<f64>> {
    let step = config.spacing();
    let shrunk = offset(std::slice::from_ref(region), -config.head_diameter / 2.0);

    let mut samples = Vec::new();
    if let Some(bb) = bounding_box(&shrunk) {
        let size = bb.size();
        let nx = (size.x / step).floor() as usize + 1;
        let ny = (size.y / step).floor() as usize + 1;
        for j in 0..ny {
            for i in 0..nx {
                let p = Point2::new(
                    (i as f64 + 0.5).mul_add(step, bb.min.x),
                    (j as f64 + 0.5).mul_add(step, bb.min.y),
                );
                if contains_point(&shrunk, &p) {
                    samples.push(p);
                }
            }
        }
    }

    if samples.is_empty() {
        samples.extend(
            shrunk
                .iter()
                .filter_map(interior_point)
                .chain(interior_point(region))
                .take(1),
        );
    }
    samples
}

/// Project a layer sample onto the surface underneath it.
fn drop_to_surface(mesh: &IndexedMesh, xy: Point2<f64>, z: f64, dz: f64) -> Option<Point3<f64>> {
    let origin = Point3::new(xy.x, xy.y, z);
    match mesh.query_ray_hit(origin, -Vector3::z()) {
        Some(hit) if hit.distance <= 2.0 * dz => Some(hit.point),
        _ => mesh.closest_point(&origin).map(|c| c.point),
    }
}

// ============================================================================
// Surface minima
// ============================================================================

/// Vertices strictly lower than every vertex they share an edge with.
///
/// Vertices are matched by position, so triangle soups work too.
fn local_minima(mesh: &IndexedMesh) -> Vec<Point3<f64>> {
    let source = mesh.mesh();
    let key = |p: &Point3<f64>| [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()];

    let mut ids: HashMap<[u64; 3], usize> = HashMap::new();
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let canonical: Vec<usize> = source
        .vertices
        .iter()
        .map(|v| {
            *ids.entry(key(&v.position)).or_insert_with(|| {
                positions.push(v.position);
                positions.len() - 1
            })
        })
        .collect();

    let mut is_minimum = vec![true; positions.len()];
    let mut used: HashSet<usize> = HashSet::new();
    for face in &source.faces {
        let corners = face.map(|i| canonical[i as usize]);
        for a in corners {
            used.insert(a);
            for b in corners {
                if a != b && positions[b].z <= positions[a].z {
                    is_minimum[a] = false;
                }
            }
        }
    }

    let mut minima: Vec<Point3<f64>> = (0..positions.len())
        .filter(|i| is_minimum[*i] && used.contains(i))
        .map(|i| positions[i])
        .collect();
    minima.sort_by(|a, b| a.z.total_cmp(&b.z).then(a.x.total_cmp(&b.x)).then(a.y.total_cmp(&b.y)));
    minima
}

// ============================================================================
// Spacing filter
// ============================================================================

type Cell = (i64, i64, i64);

/// Accepts points that keep their distance from every accepted point.
struct Placer {
    spacing: f64,
    cells: HashMap<Cell, SmallVec<[usize; 4]>>,
    points: Vec<SupportPoint>,
}

impl Placer {
    fn new(config: &AutoSupportConfig) -> Self {
        Self {
            spacing: config.spacing(),
            cells: HashMap::new(),
            points: Vec::new(),
        }
    }

    fn cell(&self, p: &Point3<f64>) -> Cell {
        (
            (p.x / self.spacing).floor() as i64,
            (p.y / self.spacing).floor() as i64,
            (p.z / self.spacing).floor() as i64,
        )
    }

    fn try_add(&mut self, point: SupportPoint) -> bool {
        let limit = self.spacing * (1.0 - 1e-6);
        let (cx, cy, cz) = self.cell(&point.pos);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    if bucket
                        .iter()
                        .any(|&i| (self.points[i].pos - point.pos).norm() < limit)
                    {
                        return false;
                    }
                }
            }
        }
        self.cells
            .entry((cx, cy, cz))
            .or_default()
            .push(self.points.len());
        self.points.push(point);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_slice::{grid, slice_mesh};
    use mesh_types::{cube, FnControl, NoControl, TriangleMesh, Vertex};
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    fn generate(mesh: &TriangleMesh, from: f64, to: f64) -> Vec<SupportPoint> {
        let heights = grid(from, to, 0.05);
        let slices = slice_mesh(mesh, &heights, 0.005).unwrap();
        let index = IndexedMesh::new(mesh).unwrap();
        AutoSupports::new(&index, &slices, &heights, &AutoSupportConfig::default(), &NoControl)
            .unwrap()
            .into_output()
    }

    /// Octahedron standing on its lower apex.
    fn octahedron() -> TriangleMesh {
        let v = [
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 2.0],
            [0.0, 2.0, 2.0],
            [-2.0, 0.0, 2.0],
            [0.0, -2.0, 2.0],
            [0.0, 0.0, 4.0],
        ];
        let mut mesh = TriangleMesh::new();
        mesh.vertices.extend(v.iter().map(|&c| Vertex::from(c)));
        for i in 0..4u32 {
            let j = 1 + (i + 1) % 4;
            mesh.faces.push([0, j, i + 1]);
            mesh.faces.push([5, i + 1, j]);
        }
        mesh
    }

    #[test]
    fn test_spacing() {
        let cfg = AutoSupportConfig::default();
        assert!((cfg.spacing() - 1.0).abs() < 1e-12);
        let cfg = cfg.with_minimal_distance(0.0).with_density(2.0);
        assert!((cfg.spacing() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config() {
        let index = IndexedMesh::new(&cube(2.0)).unwrap();
        let cfg = AutoSupportConfig::default().with_head_diameter(0.0);
        let err = AutoSupports::new(&index, &[], &[], &cfg, &NoControl).unwrap_err();
        assert!(matches!(err, SupportError::InvalidConfig { field: "head_diameter", .. }));
    }

    #[test]
    fn test_layer_mismatch() {
        let index = IndexedMesh::new(&cube(2.0)).unwrap();
        let err = AutoSupports::new(
            &index,
            &[Vec::new()],
            &[0.0, 0.05],
            &AutoSupportConfig::default(),
            &NoControl,
        )
        .unwrap_err();
        assert_eq!(err, SupportError::LayerMismatch { slices: 1, heights: 2 });
    }

    #[test]
    fn test_cube_bottom_is_covered() {
        let points = generate(&cube(6.0), -1.0, 6.0);
        assert!(!points.is_empty());
        for p in &points {
            assert!(p.pos.z.abs() < 1e-9, "point off the bottom face: {p:?}");
            assert!(p.is_new_island);
            assert!(p.pos.x.abs() <= 3.0 - 0.2 + 1e-9);
            assert!(p.pos.y.abs() <= 3.0 - 0.2 + 1e-9);
        }
        // Every spot of the bottom has an anchor within the spacing.
        for x in [-2.5, 0.0, 2.5] {
            for y in [-2.5, 0.0, 2.5] {
                let q = Point3::new(x, y, 0.0);
                assert!(points.iter().any(|p| (p.pos - q).norm() <= 1.0));
            }
        }
    }

    #[test]
    fn test_points_keep_spacing() {
        let points = generate(&cube(6.0), -1.0, 6.0);
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!((a.pos - b.pos).norm() >= 1.0 - 1e-6);
            }
        }
    }

    #[test]
    fn test_apex_is_seeded() {
        let points = generate(&octahedron(), -0.5, 4.0);
        assert!(points.iter().any(|p| p.pos.coords.norm() < 1e-9 && p.is_new_island));
        // Faces rise at 45 degrees: nothing besides the apex region.
        assert!(points.iter().all(|p| p.pos.z < 0.5));
    }

    #[test]
    fn test_model_on_the_floor_needs_nothing_above_the_bottom() {
        let points = generate(&cube(4.0), 0.0, 4.0);
        assert!(!points.is_empty());
        let mut points = points;
        remove_bottom_points(&mut points, 0.0, 1.0);
        assert!(points.is_empty());
    }

    #[test]
    fn test_empty_mesh_has_no_points() {
        let empty = IndexedMesh::new(&TriangleMesh::new()).unwrap();
        let none = AutoSupports::new(&empty, &[], &[], &AutoSupportConfig::default(), &NoControl)
            .unwrap();
        assert!(none.output().is_empty());
    }

    #[test]
    fn test_vertical_walls_need_nothing() {
        let mesh = cube(4.0);
        let heights = grid(0.5, 3.5, 0.05);
        let slices = slice_mesh(&mesh, &heights, 0.005).unwrap();
        let overhangs: Vec<_> = (1..slices.len())
            .map(|k| layer_overhangs(&slices[k], &slices[k - 1], 0.05))
            .collect();
        assert!(overhangs.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_cancellation() {
        let mesh = cube(4.0);
        let heights = grid(-1.0, 4.0, 0.05);
        let slices = slice_mesh(&mesh, &heights, 0.005).unwrap();
        let index = IndexedMesh::new(&mesh).unwrap();
        let flag = AtomicBool::new(true);
        let err = AutoSupports::new(&index, &slices, &heights, &AutoSupportConfig::default(), &flag)
            .unwrap_err();
        assert_eq!(err, SupportError::Cancelled);
    }

    #[test]
    fn test_progress_reaches_one() {
        let mesh = cube(4.0);
        let heights = grid(-1.0, 4.0, 0.05);
        let slices = slice_mesh(&mesh, &heights, 0.005).unwrap();
        let index = IndexedMesh::new(&mesh).unwrap();
        let seen = Mutex::new(Vec::new());
        let control = FnControl::new(|f| seen.lock().unwrap().push(f), || false);
        AutoSupports::new(&index, &slices, &heights, &AutoSupportConfig::default(), &control)
            .unwrap();
        let seen = seen.into_inner().unwrap();
        assert!(seen.iter().all(|f| (0.0..=1.0).contains(f)));
        assert!((seen.last().copied().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_remove_bottom_points() {
        let mut points = vec![
            SupportPoint::new(Point3::new(0.0, 0.0, 0.0), 0.2),
            SupportPoint::new(Point3::new(0.0, 0.0, 0.5), 0.2),
            SupportPoint::new(Point3::new(0.0, 0.0, 1.0), 0.2),
            SupportPoint::new(Point3::new(0.0, 0.0, 5.0), 0.2),
        ];
        remove_bottom_points(&mut points, 0.0, 1.0);
        // A point exactly at the tolerance goes too.
        assert_eq!(points.len(), 1);
        assert!((points[0].pos.z - 5.0).abs() < f64::EPSILON);

        let mut below = vec![
            SupportPoint::new(Point3::new(0.0, 0.0, -0.5), 0.2),
            SupportPoint::new(Point3::new(0.0, 0.0, -3.0), 0.2),
        ];
        remove_bottom_points(&mut below, 0.0, 1.0);
        assert_eq!(below.len(), 1);
    }
}
