//! Point and ray queries against single triangles.

use nalgebra::{Point3, Vector3};

/// Closest point to `point` on the triangle `v0 v1 v2`.
///
/// Voronoi-region walk (Ericson, *Real-Time Collision Detection* 5.1.5),
/// exact for degenerate triangles too.
#[must_use]
pub fn closest_point_on_triangle(
    point: Point3<f64>,
    v0: Point3<f64>,
    v1: Point3<f64>,
    v2: Point3<f64>,
) -> Point3<f64> {
    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = point - v0;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return v0;
    }

    let bp = point - v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return v1;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return v0 + ab * (d1 / (d1 - d3));
    }

    let cp = point - v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return v2;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return v0 + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return v1 + (v2 - v1) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    v0 + ab * (vb * denom) + ac * (vc * denom)
}

/// Distance along the ray to the triangle, if it is hit in front of the
/// origin. Both sides of the triangle count.
///
/// Moller-Trumbore. `dir` does not need to be normalized; the returned
/// parameter is in units of `dir`.
#[must_use]
pub fn ray_triangle_intersect(
    origin: Point3<f64>,
    dir: Vector3<f64>,
    v0: Point3<f64>,
    v1: Point3<f64>,
    v2: Point3<f64>,
) -> Option<f64> {
    const PARALLEL_EPS: f64 = 1e-12;
    const HIT_EPS: f64 = 1e-9;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = dir.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < PARALLEL_EPS {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t > HIT_EPS).then_some(t)
}

/// Squared distance from a point to an axis-aligned box, zero inside.
#[must_use]
pub fn point_box_distance_squared(point: &Point3<f64>, min: &Point3<f64>, max: &Point3<f64>) -> f64 {
    (0..3)
        .map(|i| {
            let d = (min[i] - point[i]).max(0.0).max(point[i] - max[i]);
            d * d
        })
        .sum()
}

/// Entry parameter of a ray into a box, `None` when it misses or the box is
/// entirely behind the origin.
#[must_use]
pub fn ray_box_entry(
    origin: &Point3<f64>,
    inv_dir: &Vector3<f64>,
    min: &Point3<f64>,
    max: &Point3<f64>,
) -> Option<f64> {
    let mut t_near = 0.0_f64;
    let mut t_far = f64::INFINITY;
    for i in 0..3 {
        let t1 = (min[i] - origin[i]) * inv_dir[i];
        let t2 = (max[i] - origin[i]) * inv_dir[i];
        // NaN from 0 * inf means the ray runs inside the slab.
        let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        if !lo.is_nan() {
            t_near = t_near.max(lo);
        }
        if !hi.is_nan() {
            t_far = t_far.min(hi);
        }
    }
    (t_near <= t_far).then_some(t_near)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tri() -> (Point3<f64>, Point3<f64>, Point3<f64>) {
        (
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
        )
    }

    #[test]
    fn closest_point_regions() {
        let (a, b, c) = tri();
        let above = closest_point_on_triangle(Point3::new(1.0, 1.0, 3.0), a, b, c);
        assert_relative_eq!(above, Point3::new(1.0, 1.0, 0.0));

        let corner = closest_point_on_triangle(Point3::new(-1.0, -1.0, 0.0), a, b, c);
        assert_relative_eq!(corner, a);

        let edge = closest_point_on_triangle(Point3::new(2.0, -3.0, 0.0), a, b, c);
        assert_relative_eq!(edge, Point3::new(2.0, 0.0, 0.0));

        let hyp = closest_point_on_triangle(Point3::new(3.0, 3.0, 0.0), a, b, c);
        assert_relative_eq!(hyp, Point3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn ray_hits_from_both_sides() {
        let (a, b, c) = tri();
        let down = ray_triangle_intersect(Point3::new(1.0, 1.0, 5.0), -Vector3::z(), a, b, c);
        assert_relative_eq!(down.unwrap(), 5.0);
        let up = ray_triangle_intersect(Point3::new(1.0, 1.0, -2.0), Vector3::z(), a, b, c);
        assert_relative_eq!(up.unwrap(), 2.0);
    }

    #[test]
    fn ray_misses_behind_and_outside() {
        let (a, b, c) = tri();
        assert!(ray_triangle_intersect(Point3::new(1.0, 1.0, 5.0), Vector3::z(), a, b, c).is_none());
        assert!(ray_triangle_intersect(Point3::new(5.0, 5.0, 5.0), -Vector3::z(), a, b, c).is_none());
        assert!(ray_triangle_intersect(Point3::new(1.0, 1.0, 5.0), Vector3::x(), a, b, c).is_none());
    }

    #[test]
    fn box_distance_and_entry() {
        let (min, max) = (Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(point_box_distance_squared(&Point3::new(0.5, 0.5, 0.5), &min, &max), 0.0);
        assert_relative_eq!(point_box_distance_squared(&Point3::new(3.0, 0.5, 0.5), &min, &max), 4.0);

        let dir = Vector3::new(1.0, 0.0, 0.0);
        let inv = dir.map(|d| 1.0 / d);
        let entry = ray_box_entry(&Point3::new(-2.0, 0.5, 0.5), &inv, &min, &max);
        assert_relative_eq!(entry.unwrap(), 2.0);
        assert!(ray_box_entry(&Point3::new(-2.0, 2.0, 0.5), &inv, &min, &max).is_none());
        assert!(ray_box_entry(&Point3::new(2.0, 0.5, 0.5), &inv, &min, &max).is_none());
    }
}
