//! Pad solid construction.
//!
//! Every footprint island becomes one closed solid, lofted through a
//! sequence of horizontal rings:
//!
//! ```text
//!  flat                         walled
//!
//!  ring 0 ___________  z = 0          ring 1 _____ ring 2      z = h
//!        /           \                      \     \
//!  ring 1 ----------- z = -t    ring 0 ______\     \           z = 0
//!                                             ring 3 -------   z = -t
//! ```
//!
//! The first ring is capped facing up, the last one facing down, and
//! consecutive rings are joined by a zipper strip.

use mesh_slice::{closing, offset, union, union_ex, ExPolygon, ExPolygons, Polygon};
use mesh_types::{Point2, Point3, TriangleMesh, Vertex};
use tracing::{debug, info, warn};

use crate::config::PadConfig;
use crate::error::{PadError, PadResult};

/// Ring vertices closer than this are merged.
const RING_EPSILON: f64 = 1e-4;

/// Twice the area of a vertex's corner triangle below which the vertex is
/// dropped as collinear.
const COLLINEAR_EPSILON: f64 = 1e-8;

/// One horizontal outline of the pad profile, counter-clockwise.
#[derive(Debug, Clone)]
struct Ring {
    points: Vec<Point2<f64>>,
    z: f64,
}

/// Build the pad under the union of `support_contours` and
/// `model_contours`.
///
/// The footprint is closed over gaps up to `max_merge_distance_mm`, loses
/// its holes and grows by `edge_radius_mm`. The pad spans
/// `z ∈ [-wall_thickness_mm, wall_height_mm]`; an empty footprint gives an
/// empty mesh.
///
/// # Errors
///
/// - [`PadError::InvalidConfig`] for a contradictory `config`.
/// - [`PadError::Triangulation`] when an outline cannot be capped.
///
/// # Example
///
/// ```
/// use mesh_slice::{ExPolygon, Polygon};
/// use mesh_types::{MeshBounds, Point2};
/// use sla_pad::{create_pad, PadConfig};
///
/// let square = ExPolygon::new(Polygon::rectangle(
///     Point2::new(0.0, 0.0),
///     Point2::new(20.0, 20.0),
/// ));
/// let config = PadConfig::default();
/// let pad = create_pad(&[], &[square], &config).unwrap();
///
/// let b = pad.bounds();
/// assert_eq!(b.max.z - b.min.z, config.full_height());
/// ```
pub fn create_pad(
    support_contours: &[ExPolygon],
    model_contours: &[ExPolygon],
    config: &PadConfig,
) -> PadResult<TriangleMesh> {
    config.validate()?;

    let islands = footprint(support_contours, model_contours, config);
    let mut mesh = TriangleMesh::new();
    for island in islands {
        let Some(rings) = profile(island, config) else {
            warn!("Pad island collapsed while offsetting, skipped");
            continue;
        };
        mesh.merge(&loft(&rings)?);
    }

    info!(
        walled = config.is_walled(),
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        "Pad created"
    );
    Ok(mesh)
}

// ============================================================================
// Footprint
// ============================================================================

fn contours_only(regions: ExPolygons) -> ExPolygons {
    regions
        .into_iter()
        .map(|r| ExPolygon::new(r.contour))
        .collect()
}

/// Outer rings of the merged, hole-free and grown footprint.
fn footprint(support: &[ExPolygon], model: &[ExPolygon], config: &PadConfig) -> Vec<Ring> {
    let merged = union(model, support);
    if merged.is_empty() {
        debug!("Empty pad footprint");
        return Vec::new();
    }
    let hull = closing(&merged, config.max_merge_distance_mm / 2.0);
    // Dropping holes can nest one island inside another.
    let solid = union_ex(&contours_only(hull));
    let grown = contours_only(offset(&solid, config.edge_radius_mm));

    let rings: Vec<Ring> = grown
        .into_iter()
        .filter_map(|r| clean_ring(r.contour))
        .map(|points| Ring { points, z: 0.0 })
        .collect();
    debug!(islands = rings.len(), "Pad footprint");
    rings
}

/// Ring profile of one island, from the top cap to the bottom cap.
fn profile(base: Ring, config: &PadConfig) -> Option<Vec<Ring>> {
    let t = config.wall_thickness_mm;
    if config.is_walled() {
        let h = config.wall_height_mm;
        let inner_top = grow(&base, config.run(h), h)?;
        let outer_top = grow(&inner_top, t, h)?;
        let bottom = grow(&outer_top, config.run(h + t), -t)?;
        Some(vec![base, inner_top, outer_top, bottom])
    } else {
        let bottom = grow(&base, config.run(t), -t)?;
        Some(vec![base, bottom])
    }
}

/// `ring` offset outward by `distance`, placed at `z`.
fn grow(ring: &Ring, distance: f64, z: f64) -> Option<Ring> {
    if distance <= 0.0 {
        return Some(Ring {
            points: ring.points.clone(),
            z,
        });
    }
    let region = ExPolygon::new(Polygon::new(ring.points.clone()));
    let outer = offset(&[region], distance)
        .into_iter()
        .map(|r| r.contour)
        .max_by(|a, b| a.area().total_cmp(&b.area()))?;
    clean_ring(outer).map(|points| Ring { points, z })
}

/// Counter-clockwise ring without near-duplicate or collinear vertices.
fn clean_ring(mut polygon: Polygon) -> Option<Vec<Point2<f64>>> {
    polygon.make_ccw();
    polygon.dedup(RING_EPSILON);
    let mut points = polygon.points;
    loop {
        let n = points.len();
        if n < 3 {
            return None;
        }
        let flat = (0..n).find(|&i| {
            let (prev, cur, next) = (points[(i + n - 1) % n], points[i], points[(i + 1) % n]);
            (cur - prev).perp(&(next - cur)).abs() < COLLINEAR_EPSILON
        });
        match flat {
            Some(i) => {
                points.remove(i);
            }
            None => return Some(points),
        }
    }
}

// ============================================================================
// Meshing
// ============================================================================

#[allow(clippy::cast_possible_truncation)]
fn loft(rings: &[Ring]) -> PadResult<TriangleMesh> {
    let total: usize = rings.iter().map(|r| r.points.len()).sum();
    let mut mesh = TriangleMesh::with_capacity(total, 2 * total);
    let mut starts = Vec::with_capacity(rings.len());
    for ring in rings {
        starts.push(mesh.vertices.len() as u32);
        mesh.vertices.extend(
            ring.points
                .iter()
                .map(|p| Vertex::new(Point3::new(p.x, p.y, ring.z))),
        );
    }

    let (Some(first), Some(last)) = (rings.first(), rings.last()) else {
        return Ok(mesh);
    };
    mesh.faces.extend(cap(&first.points, starts[0], true)?);
    for (k, pair) in rings.windows(2).enumerate() {
        mesh.faces
            .extend(zipper(&pair[0], starts[k], &pair[1], starts[k + 1]));
    }
    mesh.faces
        .extend(cap(&last.points, starts[rings.len() - 1], false)?);
    Ok(mesh)
}

/// Triangulated ring, facing up or down.
#[allow(clippy::cast_possible_truncation)]
fn cap(points: &[Point2<f64>], start: u32, up: bool) -> PadResult<Vec<[u32; 3]>> {
    let data: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    let indices = earcutr::earcut(&data, &[], 2).map_err(|_| PadError::Triangulation {
        vertices: points.len(),
    })?;
    if indices.len() / 3 != points.len() - 2 {
        return Err(PadError::Triangulation {
            vertices: points.len(),
        });
    }

    Ok(indices
        .chunks_exact(3)
        .map(|t| {
            let (a, b, c) = (t[0], t[1], t[2]);
            let ccw = (points[b] - points[a]).perp(&(points[c] - points[a])) > 0.0;
            let (b, c) = if ccw == up { (b, c) } else { (c, b) };
            [start + a as u32, start + b as u32, start + c as u32]
        })
        .collect())
}

/// Strip between two rings, always taking the shorter diagonal.
///
/// Every triangle is `[a, b, next]` where `a` is on `upper`, `b` on
/// `lower` and `next` follows one of them, which keeps the strip facing
/// away from the solid for counter-clockwise rings ordered top to bottom.
#[allow(clippy::cast_possible_truncation)]
fn zipper(upper: &Ring, upper_start: u32, lower: &Ring, lower_start: u32) -> Vec<[u32; 3]> {
    let (a, b) = (&upper.points, &lower.points);
    let (n, m) = (a.len(), b.len());
    let offset = (0..m)
        .min_by(|&i, &j| {
            (b[i] - a[0])
                .norm_squared()
                .total_cmp(&(b[j] - a[0]).norm_squared())
        })
        .unwrap_or(0);

    let at = |p: &Point2<f64>, z: f64| Point3::new(p.x, p.y, z);
    let area = |p: Point3<f64>, q: Point3<f64>, r: Point3<f64>| (q - p).cross(&(r - p)).norm();

    let mut faces = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        let pa = at(&a[i % n], upper.z);
        let pb = at(&b[(offset + j) % m], lower.z);
        let pa_next = at(&a[(i + 1) % n], upper.z);
        let pb_next = at(&b[(offset + j + 1) % m], lower.z);

        let advance_upper = if i == n {
            false
        } else if j == m {
            true
        } else {
            let prefer = (pa_next - pb).norm_squared() <= (pb_next - pa).norm_squared();
            // Never emit a sliver when the other diagonal is available.
            let upper_area = area(pa, pb, pa_next);
            let lower_area = area(pa, pb, pb_next);
            if prefer {
                upper_area >= COLLINEAR_EPSILON || lower_area < COLLINEAR_EPSILON
            } else {
                lower_area < COLLINEAR_EPSILON && upper_area >= COLLINEAR_EPSILON
            }
        };

        let ia = upper_start + (i % n) as u32;
        let ib = lower_start + ((offset + j) % m) as u32;
        if advance_upper {
            faces.push([ia, ib, upper_start + ((i + 1) % n) as u32]);
            i += 1;
        } else {
            faces.push([ia, ib, lower_start + ((offset + j + 1) % m) as u32]);
            j += 1;
        }
    }
    faces
}
