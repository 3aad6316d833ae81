//! Polygon booleans and offsets.
//!
//! Thin layer over `geo-clipper`: regions are converted to `geo` polygons in
//! clipper units ([`CLIPPER_SCALE`] per millimeter), clipped on the integer
//! grid and converted back with contours counter-clockwise and holes
//! clockwise. Offset distances and arc tolerances are scaled the same way
//! and the clipper itself always runs with a factor of 1.

use geo::orient::{Direction, Orient};
use geo::{Contains, Coord, InteriorPoint, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};
use mesh_types::Point2;

use crate::polygon::{BoundingBox, ExPolygon, ExPolygons, Polygon};

/// Integer grid resolution used by the clipper, in units per millimeter.
pub const CLIPPER_SCALE: f64 = 100_000.0;

/// Arc tolerance for round joins, in millimeters. Clipper caps it at a
/// quarter of the offset distance.
const ARC_TOLERANCE: f64 = 0.001;

fn ring_to_geo(ring: &Polygon) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring
        .points
        .iter()
        .map(|p| Coord {
            x: p.x * CLIPPER_SCALE,
            y: p.y * CLIPPER_SCALE,
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

fn geo_to_ring(ring: &LineString<f64>) -> Polygon {
    let mut poly = Polygon::new(
        ring.coords()
            .map(|c| Point2::new(c.x / CLIPPER_SCALE, c.y / CLIPPER_SCALE))
            .collect(),
    );
    // geo rings repeat the first point at the end.
    if poly.points.len() > 1 && poly.points.first() == poly.points.last() {
        poly.points.pop();
    }
    poly
}

fn to_geo(region: &ExPolygon) -> GeoPolygon<f64> {
    GeoPolygon::new(
        ring_to_geo(&region.contour),
        region.holes.iter().map(ring_to_geo).collect(),
    )
    .orient(Direction::Default)
}

fn to_geo_multi(regions: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(
        regions
            .iter()
            .filter(|r| !r.is_empty())
            .map(to_geo)
            .collect(),
    )
}

fn from_geo(poly: &GeoPolygon<f64>) -> ExPolygon {
    let mut region = ExPolygon::with_holes(
        geo_to_ring(poly.exterior()),
        poly.interiors()
            .iter()
            .map(geo_to_ring)
            .filter(|h| !h.is_empty())
            .collect(),
    );
    region.normalize();
    region
}

fn from_geo_multi(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi
        .0
        .iter()
        .map(from_geo)
        .filter(|r| !r.is_empty())
        .collect()
}

// ============================================================================
// Booleans
// ============================================================================

/// Union of two region sets.
#[must_use]
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return union_ex(clip);
    }
    if clip.is_empty() {
        return union_ex(subject);
    }
    let result = to_geo_multi(subject).union(&to_geo_multi(clip), 1.0);
    from_geo_multi(&result)
}

/// Merge possibly overlapping regions into a disjoint set.
///
/// Reduces pairwise in a balanced tree so each clipper call sees two
/// internally disjoint operands.
#[must_use]
pub fn union_ex(regions: &[ExPolygon]) -> ExPolygons {
    match regions.len() {
        0 => Vec::new(),
        1 => {
            let result = to_geo_multi(regions).union(&MultiPolygon::new(Vec::new()), 1.0);
            from_geo_multi(&result)
        }
        n => {
            let (left, right) = regions.split_at(n / 2);
            let (left, right) = (union_ex(left), union_ex(right));
            if left.is_empty() {
                return right;
            }
            if right.is_empty() {
                return left;
            }
            from_geo_multi(&to_geo_multi(&left).union(&to_geo_multi(&right), 1.0))
        }
    }
}

/// Union of plain rings, each treated as a hole-free region.
#[must_use]
pub fn union_polygons(polygons: &[Polygon]) -> ExPolygons {
    let regions: ExPolygons = polygons
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| ExPolygon::new(p.clone()))
        .collect();
    union_ex(&regions)
}

/// Area covered by both sets.
#[must_use]
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return Vec::new();
    }
    let result = to_geo_multi(subject).intersection(&to_geo_multi(clip), 1.0);
    from_geo_multi(&result)
}

/// `subject` minus `clip`.
#[must_use]
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return Vec::new();
    }
    if clip.is_empty() {
        return subject.to_vec();
    }
    let result = to_geo_multi(subject).difference(&to_geo_multi(clip), 1.0);
    from_geo_multi(&result)
}

// ============================================================================
// Offsets
// ============================================================================

/// Grow (`delta > 0`) or shrink (`delta < 0`) regions with round joins.
#[must_use]
pub fn offset(regions: &[ExPolygon], delta: f64) -> ExPolygons {
    if regions.is_empty() {
        return Vec::new();
    }
    if delta == 0.0 {
        return regions.to_vec();
    }
    let result = to_geo_multi(regions).offset(
        delta * CLIPPER_SCALE,
        JoinType::Round(ARC_TOLERANCE * CLIPPER_SCALE),
        EndType::ClosedPolygon,
        1.0,
    );
    from_geo_multi(&result)
}

/// Morphological closing: grow by `radius`, then shrink by it.
///
/// Fills gaps and notches narrower than `2 * radius` and merges regions
/// that nearly touch, without moving straight boundaries.
#[must_use]
pub fn closing(regions: &[ExPolygon], radius: f64) -> ExPolygons {
    if radius <= 0.0 {
        return union_ex(regions);
    }
    offset(&offset(regions, radius), -radius)
}

// ============================================================================
// Queries
// ============================================================================

/// Total area of a region set.
#[must_use]
pub fn area(regions: &[ExPolygon]) -> f64 {
    regions.iter().map(ExPolygon::area).sum()
}

/// Whether any region strictly contains `p`.
#[must_use]
pub fn contains_point(regions: &[ExPolygon], p: &Point2<f64>) -> bool {
    let point = geo::Point::new(p.x * CLIPPER_SCALE, p.y * CLIPPER_SCALE);
    regions
        .iter()
        .filter(|r| !r.is_empty())
        .any(|r| to_geo(r).contains(&point))
}

/// A point guaranteed inside the region, when it has any area.
#[must_use]
pub fn interior_point(region: &ExPolygon) -> Option<Point2<f64>> {
    if region.is_empty() {
        return None;
    }
    to_geo(region)
        .interior_point()
        .map(|p| Point2::new(p.x() / CLIPPER_SCALE, p.y() / CLIPPER_SCALE))
}

/// Bounds of a region set, `None` when empty.
#[must_use]
pub fn bounding_box(regions: &[ExPolygon]) -> Option<BoundingBox> {
    regions
        .iter()
        .filter_map(ExPolygon::bounding_box)
        .reduce(|a, b| a.union(&b))
}
