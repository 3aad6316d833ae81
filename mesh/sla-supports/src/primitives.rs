//! Support tree building blocks and their meshes.
//!
//! Every primitive is a closed surface of revolution with its own vertices.
//! The tree mesh is the plain concatenation of all of them, so it is
//! manifold as long as each piece is.

// Allow numeric casts inherent to geometry (vertex indices, segment counts)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::f64::consts::{PI, TAU};

use mesh_types::{Point3, TriangleMesh, Vertex, Vector3};

use crate::config::SupportConfig;

/// Segments around heads, bridges and junctions.
const FINE_SEGMENTS: usize = 13;

/// Segments around pillars and their bases.
const COARSE_SEGMENTS: usize = 17;

/// Latitude bands on junction spheres. Odd, so there is no equator ring.
const SPHERE_BANDS: usize = 7;

/// Pole axis of junction spheres, tilted so no vertex lands on the pillar
/// axis, where pillar and head poles sit.
const JUNCTION_AXIS: [f64; 3] = [0.6, 0.0, 0.8];

/// Latitude steps on the front and back arcs of a head.
const HEAD_FRONT_STEPS: usize = 3;
const HEAD_BACK_STEPS: usize = 5;

/// The contact piece of a support: a small sphere pressed into the model,
/// a cone widening away from it and a larger sphere the rest of the tree
/// attaches to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Head {
    /// The support point on the model surface.
    pub tip: Point3<f64>,
    /// Unit direction from the tip away from the model.
    pub dir: Vector3<f64>,
    /// Radius of the sphere touching the model.
    pub front_radius: f64,
    /// Radius of the sphere at the other end.
    pub back_radius: f64,
    /// Length of the cone between the spheres.
    pub width: f64,
    /// Depth of the tip inside the model, negative for a gap.
    pub penetration: f64,
}

impl Head {
    /// A head at `tip` pointing along `dir`, sized by `config`.
    #[must_use]
    pub fn new(tip: Point3<f64>, dir: Vector3<f64>, config: &SupportConfig) -> Self {
        Self {
            tip,
            dir: dir.normalize(),
            front_radius: config.head_front_radius_mm,
            back_radius: config.head_back_radius_mm,
            width: config.head_width_mm,
            penetration: config.head_penetration_mm,
        }
    }

    /// Centre of the front sphere. Its surface reaches `penetration` past
    /// the tip.
    #[must_use]
    pub fn front_center(&self) -> Point3<f64> {
        self.tip + self.dir * (self.front_radius - self.penetration)
    }

    /// Distance between the sphere centres.
    #[must_use]
    pub fn center_distance(&self) -> f64 {
        self.front_radius + self.width + self.back_radius
    }

    /// Centre of the back sphere, where pillars and bridges attach.
    #[must_use]
    pub fn junction_point(&self) -> Point3<f64> {
        self.front_center() + self.dir * self.center_distance()
    }

    /// Highest Z of the head surface.
    #[must_use]
    pub fn top_z(&self) -> f64 {
        (self.front_center().z + self.front_radius).max(self.junction_point().z + self.back_radius)
    }

    /// Move the head `distance` further along its direction.
    #[must_use]
    pub fn pushed(&self, distance: f64) -> Self {
        Self {
            tip: self.tip + self.dir * distance,
            ..*self
        }
    }

    /// Closed surface of the head.
    #[must_use]
    pub fn mesh(&self, phase: f64) -> TriangleMesh {
        let (rf, rb) = (self.front_radius, self.back_radius);
        let l = self.center_distance();
        // Half-angle of the cone tangent to both spheres.
        let alpha = ((rb - rf) / l).clamp(-1.0, 1.0).asin();
        let tangent = PI / 2.0 + alpha;

        let mut profile = Vec::with_capacity(HEAD_FRONT_STEPS + HEAD_BACK_STEPS + 2);
        profile.push((0.0, -rf));
        for k in 1..=HEAD_FRONT_STEPS {
            let phi = PI - (PI - tangent) * k as f64 / HEAD_FRONT_STEPS as f64;
            profile.push((rf * phi.sin(), rf * phi.cos()));
        }
        for k in 0..HEAD_BACK_STEPS {
            let phi = tangent * (1.0 - k as f64 / HEAD_BACK_STEPS as f64);
            profile.push((rb * phi.sin(), rb.mul_add(phi.cos(), l)));
        }
        profile.push((0.0, l + rb));

        revolve(&profile, self.front_center(), self.dir, FINE_SEGMENTS, phase)
    }
}

/// A straight column between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pillar {
    /// Upper end, inside the head or junction it hangs from.
    pub top: Point3<f64>,
    /// Lower end, inside the base or the head it stands on.
    pub bottom: Point3<f64>,
    /// Column radius.
    pub radius: f64,
}

impl Pillar {
    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.top.z - self.bottom.z
    }

    /// Closed surface, empty for a zero-length pillar.
    #[must_use]
    pub fn mesh(&self, phase: f64) -> TriangleMesh {
        cylinder(self.bottom, self.top, self.radius, COARSE_SEGMENTS, phase).unwrap_or_default()
    }
}

/// Conical foot of a ground pillar. Its bottom disc lies on the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PillarBase {
    /// Centre of the bottom disc.
    pub ground: Point3<f64>,
    /// Radius on the ground.
    pub bottom_radius: f64,
    /// Radius at the top, equal to the pillar radius.
    pub top_radius: f64,
    /// Cone height.
    pub height: f64,
}

impl PillarBase {
    /// Closed surface of the frustum.
    #[must_use]
    pub fn mesh(&self, phase: f64) -> TriangleMesh {
        let profile = [
            (0.0, 0.0),
            (self.bottom_radius, 0.0),
            (self.top_radius, self.height),
            (0.0, self.height),
        ];
        revolve(&profile, self.ground, Vector3::z(), COARSE_SEGMENTS, phase)
    }
}

/// Sphere joining bridges to a pillar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Junction {
    /// Sphere centre, on the pillar axis.
    pub center: Point3<f64>,
    /// Sphere radius.
    pub radius: f64,
}

impl Junction {
    /// Closed surface of the sphere.
    #[must_use]
    pub fn mesh(&self, phase: f64) -> TriangleMesh {
        let [x, y, z] = JUNCTION_AXIS;
        sphere(self.center, self.radius, Vector3::new(x, y, z), phase)
    }
}

/// Sloped strut between a head or junction and another junction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bridge {
    /// Upper end.
    pub start: Point3<f64>,
    /// Lower end.
    pub end: Point3<f64>,
    /// Strut radius.
    pub radius: f64,
}

impl Bridge {
    /// Strut length.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Closed surface, empty for a zero-length bridge.
    #[must_use]
    pub fn mesh(&self, phase: f64) -> TriangleMesh {
        cylinder(self.start, self.end, self.radius, FINE_SEGMENTS, phase).unwrap_or_default()
    }
}

/// One element of a [`SupportTree`](crate::SupportTree).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// Contact with the model.
    Head(Head),
    /// Column towards the ground or the model.
    Pillar(Pillar),
    /// Foot of a ground pillar.
    PillarBase(PillarBase),
    /// Sphere where bridges meet a pillar.
    Junction(Junction),
    /// Sloped strut.
    Bridge(Bridge),
}

impl Primitive {
    /// Closed surface of the element. `phase` rotates the tessellation
    /// around the element's axis.
    #[must_use]
    pub fn mesh(&self, phase: f64) -> TriangleMesh {
        match self {
            Self::Head(h) => h.mesh(phase),
            Self::Pillar(p) => p.mesh(phase),
            Self::PillarBase(b) => b.mesh(phase),
            Self::Junction(j) => j.mesh(phase),
            Self::Bridge(b) => b.mesh(phase),
        }
    }
}

// ============================================================================
// Tessellation
// ============================================================================

/// Two unit vectors completing `axis` to a right-handed frame.
fn perpendicular_frame(axis: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let up = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = axis.cross(&up).normalize();
    let v = axis.cross(&u);
    (u, v)
}

/// Closed surface of revolution.
///
/// `profile` lists `(radius, height)` pairs from the lower pole to the
/// upper pole, heights measured along `axis` from `base`. The first and
/// last radius are treated as zero; every other ring needs a positive
/// radius. Faces wind counter-clockwise seen from outside.
pub(crate) fn revolve(
    profile: &[(f64, f64)],
    base: Point3<f64>,
    axis: Vector3<f64>,
    segments: usize,
    phase: f64,
) -> TriangleMesh {
    let Some(axis) = axis.try_normalize(f64::EPSILON) else {
        return TriangleMesh::new();
    };
    if profile.len() < 3 {
        return TriangleMesh::new();
    }
    let segments = segments.max(3);
    let (u, v) = perpendicular_frame(&axis);
    let rings = profile.len() - 2;

    let mut mesh = TriangleMesh::with_capacity(rings * segments + 2, 2 * segments * rings);

    let (_, h0) = profile[0];
    mesh.vertices.push(Vertex::new(base + axis * h0));
    for &(radius, height) in &profile[1..=rings] {
        let center = base + axis * height;
        for j in 0..segments {
            let theta = TAU.mul_add(j as f64 / segments as f64, phase);
            let offset = u * theta.cos() + v * theta.sin();
            mesh.vertices.push(Vertex::new(center + offset * radius));
        }
    }
    let (_, h1) = profile[profile.len() - 1];
    mesh.vertices.push(Vertex::new(base + axis * h1));

    let seg = segments as u32;
    let bottom = 0u32;
    let top = (rings * segments + 1) as u32;
    let ring = |i: usize, j: u32| 1 + (i as u32) * seg + j % seg;

    for j in 0..seg {
        mesh.faces.push([bottom, ring(0, j + 1), ring(0, j)]);
    }
    for i in 0..rings - 1 {
        for j in 0..seg {
            let (a, b) = (ring(i, j), ring(i, j + 1));
            let (c, d) = (ring(i + 1, j + 1), ring(i + 1, j));
            mesh.faces.push([a, b, c]);
            mesh.faces.push([a, c, d]);
        }
    }
    for j in 0..seg {
        mesh.faces.push([top, ring(rings - 1, j), ring(rings - 1, j + 1)]);
    }

    mesh
}

/// Capped cylinder from `start` to `end`, `None` when they coincide.
pub(crate) fn cylinder(
    start: Point3<f64>,
    end: Point3<f64>,
    radius: f64,
    segments: usize,
    phase: f64,
) -> Option<TriangleMesh> {
    let axis = end - start;
    let length = axis.norm();
    if length < f64::EPSILON {
        return None;
    }
    let profile = [(0.0, 0.0), (radius, 0.0), (radius, length), (0.0, length)];
    Some(revolve(&profile, start, axis / length, segments, phase))
}

/// UV sphere without an equator ring, poles along `axis`.
pub(crate) fn sphere(
    center: Point3<f64>,
    radius: f64,
    axis: Vector3<f64>,
    phase: f64,
) -> TriangleMesh {
    let profile: Vec<(f64, f64)> = (0..=SPHERE_BANDS)
        .map(|k| {
            let phi = PI * (1.0 - k as f64 / SPHERE_BANDS as f64);
            let r = if k == 0 || k == SPHERE_BANDS {
                0.0
            } else {
                radius * phi.sin()
            };
            (r, radius * phi.cos())
        })
        .collect();
    revolve(&profile, center, axis, FINE_SEGMENTS, phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_repair::{is_manifold, needs_repair, validate_mesh};
    use mesh_types::MeshBounds;

    fn assert_closed(mesh: &TriangleMesh) {
        assert!(is_manifold(mesh));
        assert!(!needs_repair(mesh));
        assert!(mesh.signed_volume() > 0.0);
        let report = validate_mesh(mesh);
        assert_eq!(report.inconsistent_edge_count, 0);
        assert_eq!(report.degenerate_face_count, 0);
    }

    #[test]
    fn test_cylinder_is_closed_and_sized() {
        let c = cylinder(Point3::origin(), Point3::new(0.0, 0.0, 5.0), 1.0, 17, 0.3).unwrap();
        assert_closed(&c);
        let b = c.bounds();
        assert_relative_eq!(b.min.z, 0.0);
        assert_relative_eq!(b.max.z, 5.0);
        // Inscribed polygon area times height.
        let area = 0.5 * 17.0 * (TAU / 17.0).sin();
        assert_relative_eq!(c.volume(), area * 5.0, epsilon = 1e-9);
        assert!(cylinder(Point3::origin(), Point3::origin(), 1.0, 8, 0.0).is_none());
    }

    #[test]
    fn test_tilted_cylinder_orientation() {
        let c = cylinder(Point3::new(1.0, 2.0, 3.0), Point3::new(-2.0, 4.0, -1.0), 0.4, 13, 0.0)
            .unwrap();
        assert_closed(&c);
    }

    #[test]
    fn test_sphere_has_no_equator() {
        let s = sphere(Point3::new(1.0, 1.0, 1.0), 2.0, Vector3::z(), 0.0);
        assert_closed(&s);
        assert!(s.vertices.iter().all(|v| (v.position.z - 1.0).abs() > 1e-3));
        let b = s.bounds();
        assert_relative_eq!(b.min.z, -1.0, epsilon = 1e-12);
        assert_relative_eq!(b.max.z, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_junction_below_pillar_top_shares_no_vertex() {
        // Junction one radius under the pillar end: the sphere passes
        // through the pillar's top pole.
        let pillar = Pillar {
            top: Point3::new(0.0, 0.0, -1.65),
            bottom: Point3::new(0.0, 0.0, -9.5),
            radius: 0.75,
        };
        let junction = Junction {
            center: Point3::new(0.0, 0.0, -2.4),
            radius: 0.75,
        };
        let j = junction.mesh(0.4);
        assert_closed(&j);
        for phase in [0.0, 1.3, 2.6] {
            let p = pillar.mesh(phase);
            for a in &j.vertices {
                assert!(p
                    .vertices
                    .iter()
                    .all(|b| (a.position - b.position).norm() > 1e-6));
            }
        }
        // Nothing of the junction sits on the pillar axis.
        assert!(j
            .vertices
            .iter()
            .all(|v| v.position.x.hypot(v.position.y) > 1e-3));
    }

    #[test]
    fn test_head_geometry() {
        let cfg = SupportConfig::default();
        let head = Head::new(Point3::origin(), -Vector3::z(), &cfg);
        // Tip sphere reaches `penetration` above the support point.
        assert_relative_eq!(head.front_center().z + cfg.head_front_radius_mm, 0.5, epsilon = 1e-12);
        assert_relative_eq!(head.junction_point().z, -cfg.head_length(), epsilon = 1e-12);

        let mesh = head.mesh(0.0);
        assert_closed(&mesh);
        let b = mesh.bounds();
        assert_relative_eq!(b.max.z, 0.5, epsilon = 1e-9);
        assert_relative_eq!(b.min.z, -cfg.head_length() - cfg.head_back_radius_mm, epsilon = 1e-9);
        assert_relative_eq!(head.top_z(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_penetration_leaves_gap() {
        let cfg = SupportConfig::default().with_head_penetration(-0.1);
        let head = Head::new(Point3::origin(), -Vector3::z(), &cfg);
        assert_relative_eq!(head.top_z(), -0.1, epsilon = 1e-12);
        let pushed = head.pushed(0.2);
        assert_relative_eq!(pushed.top_z(), -0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_base_sits_on_ground() {
        let base = PillarBase {
            ground: Point3::new(3.0, -2.0, -10.0),
            bottom_radius: 2.0,
            top_radius: 0.5,
            height: 1.0,
        };
        for phase in [0.0, 0.7, 2.1] {
            let mesh = base.mesh(phase);
            assert_closed(&mesh);
            assert_eq!(mesh.bounds().min.z, -10.0);
        }
    }

    #[test]
    fn test_primitive_dispatch() {
        let j = Primitive::Junction(Junction {
            center: Point3::origin(),
            radius: 0.5,
        });
        assert_eq!(j.mesh(0.0).vertices.len(), (SPHERE_BANDS - 1) * FINE_SEGMENTS + 2);
        let degenerate = Primitive::Bridge(Bridge {
            start: Point3::origin(),
            end: Point3::origin(),
            radius: 0.5,
        });
        assert!(degenerate.mesh(0.0).faces.is_empty());
    }
}
