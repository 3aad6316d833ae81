//! 2D polygon types.

use mesh_types::{Point2, Vector2};

/// A simple closed ring. The closing edge is implicit: the last point
/// connects back to the first.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    /// Ring vertices, without a repeated closing point.
    pub points: Vec<Point2<f64>>,
}

impl Polygon {
    /// A ring through `points`.
    #[must_use]
    pub const fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle, counter-clockwise.
    #[must_use]
    pub fn rectangle(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self::new(vec![
            min,
            Point2::new(max.x, min.y),
            max,
            Point2::new(min.x, max.y),
        ])
    }

    /// Regular `segments`-gon approximating a circle, counter-clockwise.
    #[must_use]
    pub fn circle(center: Point2<f64>, radius: f64, segments: usize) -> Self {
        let n = segments.max(3);
        #[allow(clippy::cast_precision_loss)]
        let points = (0..n)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / n as f64;
                center + Vector2::new(a.cos(), a.sin()) * radius
            })
            .collect();
        Self::new(points)
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// A ring needs at least three vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.len() < 3
    }

    /// Shoelace area, positive for counter-clockwise rings.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice * 0.5
    }

    /// Enclosed area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Counter-clockwise seen from +Z.
    #[must_use]
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Reverse the vertex order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Make the ring counter-clockwise.
    pub fn make_ccw(&mut self) {
        if self.signed_area() < 0.0 {
            self.reverse();
        }
    }

    /// Make the ring clockwise.
    pub fn make_cw(&mut self) {
        if self.signed_area() > 0.0 {
            self.reverse();
        }
    }

    /// Ring edges as point pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Perimeter length.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.edges().map(|(a, b)| (b - a).norm()).sum()
    }

    /// Even-odd point-in-ring test. Points on the boundary may go either way.
    #[must_use]
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Bounds, `None` for an empty ring.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    /// Drop consecutive duplicate vertices, including a repeated closing
    /// point.
    pub fn dedup(&mut self, epsilon: f64) {
        let eps2 = epsilon * epsilon;
        self.points.dedup_by(|b, a| (*b - *a).norm_squared() <= eps2);
        while self.points.len() > 1 {
            let (first, last) = (self.points[0], self.points[self.points.len() - 1]);
            if (first - last).norm_squared() <= eps2 {
                self.points.pop();
            } else {
                break;
            }
        }
    }

    /// Shift every vertex.
    pub fn translate(&mut self, offset: Vector2<f64>) {
        for p in &mut self.points {
            *p += offset;
        }
    }
}

/// A region: one outer contour with zero or more holes.
///
/// Contours are counter-clockwise and holes clockwise once normalized by
/// the operations in this crate.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExPolygon {
    /// Outer boundary.
    pub contour: Polygon,
    /// Holes inside the contour.
    pub holes: Vec<Polygon>,
}

/// A set of disjoint regions, typically one slice layer.
pub type ExPolygons = Vec<ExPolygon>;

impl ExPolygon {
    /// A region without holes.
    #[must_use]
    pub const fn new(contour: Polygon) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    /// A region with holes.
    #[must_use]
    pub const fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        Self { contour, holes }
    }

    /// Contour area minus hole area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.contour.area() - self.holes.iter().map(Polygon::area).sum::<f64>()
    }

    /// `true` for a degenerate contour.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty()
    }

    /// Inside the contour and outside every hole.
    #[must_use]
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        self.contour.contains(p) && !self.holes.iter().any(|h| h.contains(p))
    }

    /// Bounds of the contour.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.contour.bounding_box()
    }

    /// Contour counter-clockwise, holes clockwise.
    pub fn normalize(&mut self) {
        self.contour.make_ccw();
        for hole in &mut self.holes {
            hole.make_cw();
        }
    }

    /// Shift contour and holes.
    pub fn translate(&mut self, offset: Vector2<f64>) {
        self.contour.translate(offset);
        for hole in &mut self.holes {
            hole.translate(offset);
        }
    }
}

/// Axis-aligned 2D bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point2<f64>,
    /// Maximum corner.
    pub max: Point2<f64>,
}

impl BoundingBox {
    /// Bounds of `points`, `None` when there are none.
    #[must_use]
    pub fn from_points(points: &[Point2<f64>]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().skip(1).fold(
            Self {
                min: first,
                max: first,
            },
            |b, p| Self {
                min: Point2::new(b.min.x.min(p.x), b.min.y.min(p.y)),
                max: Point2::new(b.max.x.max(p.x), b.max.y.max(p.y)),
            },
        ))
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Width and height.
    #[must_use]
    pub fn size(&self) -> Vector2<f64> {
        self.max - self.min
    }

    /// Midpoint.
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Polygon {
        Polygon::rectangle(Point2::origin(), Point2::new(size, size))
    }

    #[test]
    fn orientation_and_area() {
        let mut sq = square(2.0);
        assert!(sq.is_ccw());
        assert!((sq.signed_area() - 4.0).abs() < 1e-12);
        sq.make_cw();
        assert!((sq.signed_area() + 4.0).abs() < 1e-12);
        assert!((sq.area() - 4.0).abs() < 1e-12);
        assert!((sq.perimeter() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn region_with_hole() {
        let mut hole = Polygon::rectangle(Point2::new(1.0, 1.0), Point2::new(3.0, 3.0));
        hole.make_cw();
        let region = ExPolygon::with_holes(square(4.0), vec![hole]);
        assert!((region.area() - 12.0).abs() < 1e-12);
        assert!(region.contains(&Point2::new(0.5, 0.5)));
        assert!(!region.contains(&Point2::new(2.0, 2.0)));
        assert!(!region.contains(&Point2::new(5.0, 2.0)));
    }

    #[test]
    fn dedup_removes_repeats_and_closing_point() {
        let mut p = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 0.0),
        ]);
        p.dedup(1e-9);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn circle_is_ccw_and_close_to_pi_r2() {
        let c = Polygon::circle(Point2::new(1.0, 1.0), 2.0, 128);
        assert!(c.is_ccw());
        assert!((c.area() - std::f64::consts::PI * 4.0).abs() < 0.01);
        let bb = c.bounding_box().unwrap();
        assert!((bb.center() - Point2::new(1.0, 1.0)).norm() < 1e-9);
    }
}
