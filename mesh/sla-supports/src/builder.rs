//! Routing support points to the ground or back to the model.

// Allow numeric casts inherent to geometry (counts, sample steps)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use mesh_index::IndexedMesh;
use mesh_types::{JobControl, Point2, Point3, Vector2, Vector3};
use tracing::{debug, info, warn};

use crate::config::SupportConfig;
use crate::error::{SupportError, SupportResult};
use crate::points::SupportPoint;
use crate::primitives::{Bridge, Head, Junction, Pillar, PillarBase, Primitive};

/// Number of build stages, for progress reporting.
const STAGES: f64 = 6.0;

/// Pushes tried per head when clearing it from the model.
const PUSH_STEPS: usize = 8;

/// Junctions on one pillar closer than this in Z are shared.
const JUNCTION_EPSILON: f64 = 1e-4;

/// A head and how it continues downwards.
#[derive(Debug, Clone, Copy)]
struct PlacedHead {
    head: Head,
    /// Where a ray straight down from the back sphere meets the model.
    model_hit: Option<Point3<f64>>,
}

/// A ground pillar while the tree is being built.
#[derive(Debug)]
struct GroundPillar {
    axis: Point2<f64>,
    top: f64,
    radius: f64,
    junctions: Vec<f64>,
}

impl GroundPillar {
    fn top_point(&self) -> Point3<f64> {
        Point3::new(self.axis.x, self.axis.y, self.top)
    }

    fn at(&self, z: f64) -> Point3<f64> {
        Point3::new(self.axis.x, self.axis.y, z)
    }
}

/// Builds the primitive arena of a support tree.
pub(crate) struct TreeBuilder<'a> {
    mesh: &'a IndexedMesh,
    cfg: &'a SupportConfig,
    control: &'a dyn JobControl,
    ground: f64,
    pillars: Vec<GroundPillar>,
    extra: Vec<Primitive>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        mesh: &'a IndexedMesh,
        cfg: &'a SupportConfig,
        control: &'a dyn JobControl,
        ground: f64,
    ) -> Self {
        Self {
            mesh,
            cfg,
            control,
            ground,
            pillars: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Run every stage and return the primitives in arena order.
    pub(crate) fn build(mut self, points: &[SupportPoint]) -> SupportResult<Vec<Primitive>> {
        info!(
            points = points.len(),
            ground = self.ground,
            "Building support tree"
        );

        let filtered = self.filter_points(points)?;
        self.stage_done(1.0)?;

        let placed = self.place_heads(&filtered)?;
        self.stage_done(2.0)?;

        let (to_ground, to_model): (Vec<PlacedHead>, Vec<PlacedHead>) =
            placed.into_iter().partition(|h| h.model_hit.is_none());
        debug!(
            ground = to_ground.len(),
            model = to_model.len(),
            "Classified heads"
        );
        self.stage_done(3.0)?;

        self.route_to_ground(&to_ground)?;
        self.stage_done(4.0)?;

        self.route_to_model(&to_model)?;
        self.stage_done(5.0)?;

        self.interconnect();
        self.stage_done(STAGES)?;

        Ok(self.into_primitives())
    }

    fn stage_done(&self, stage: f64) -> SupportResult<()> {
        self.control.report_progress(stage / STAGES);
        self.check_cancel()
    }

    fn check_cancel(&self) -> SupportResult<()> {
        if self.control.should_cancel() {
            Err(SupportError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn clearance(&self) -> f64 {
        (-self.cfg.head_penetration_mm).max(0.0) / 2.0
    }

    // ========================================================================
    // Stage 1: filter
    // ========================================================================

    /// Drop points crowding an earlier one and look up surface normals.
    fn filter_points(
        &self,
        points: &[SupportPoint],
    ) -> SupportResult<Vec<(Point3<f64>, Vector3<f64>)>> {
        let min_dist = 2.0 * self.cfg.head_back_radius_mm * (1.0 - 1e-6);
        let mut kept: Vec<(Point3<f64>, Vector3<f64>)> = Vec::with_capacity(points.len());
        for point in points {
            self.check_cancel()?;
            if kept.iter().any(|(p, _)| (p - point.pos).norm() < min_dist) {
                continue;
            }
            let normal = self
                .mesh
                .closest_point(&point.pos)
                .and_then(|c| self.mesh.face_normal(c.face));
            match normal {
                Some(n) => kept.push((point.pos, n)),
                None => warn!(
                    x = point.pos.x,
                    y = point.pos.y,
                    z = point.pos.z,
                    "No surface near support point"
                ),
            }
        }
        debug!(
            kept = kept.len(),
            dropped = points.len() - kept.len(),
            "Filtered support points"
        );
        Ok(kept)
    }

    // ========================================================================
    // Stage 2: heads
    // ========================================================================

    /// Head direction: the normal, tilted down to the cutoff angle.
    fn head_direction(&self, normal: &Vector3<f64>) -> Vector3<f64> {
        let polar = normal.z.clamp(-1.0, 1.0).acos();
        if polar >= self.cfg.normal_cutoff_angle {
            return *normal;
        }
        let azimuth = normal.y.atan2(normal.x);
        let polar = self.cfg.normal_cutoff_angle;
        Vector3::new(
            polar.sin() * azimuth.cos(),
            polar.sin() * azimuth.sin(),
            polar.cos(),
        )
    }

    fn place_heads(
        &self,
        points: &[(Point3<f64>, Vector3<f64>)],
    ) -> SupportResult<Vec<PlacedHead>> {
        let top = self.mesh.bounds().max.z;
        let mut placed = Vec::with_capacity(points.len());
        for (pos, normal) in points {
            self.check_cancel()?;
            let dir = self.head_direction(normal);
            let Some(head) = self.clear_head(Head::new(*pos, dir, self.cfg)) else {
                warn!(x = pos.x, y = pos.y, z = pos.z, "Head collides with the model, discarded");
                continue;
            };
            if head.top_z() > top {
                warn!(x = pos.x, y = pos.y, z = pos.z, "Head above the model top, discarded");
                continue;
            }
            let back = head.junction_point();
            let model_hit = self
                .mesh
                .query_ray_hit(back, -Vector3::z())
                .map(|hit| hit.point);
            placed.push(PlacedHead { head, model_hit });
        }
        debug!(heads = placed.len(), "Placed heads");
        Ok(placed)
    }

    /// With a negative penetration, move the head away from the surface
    /// until it keeps its distance. `None` if it never does.
    fn clear_head(&self, head: Head) -> Option<Head> {
        if self.cfg.head_penetration_mm >= 0.0 {
            return Some(head);
        }
        let step = head.width.max(head.front_radius) / PUSH_STEPS as f64;
        (0..=PUSH_STEPS)
            .map(|k| head.pushed(step * k as f64))
            .find(|h| self.head_is_clear(h))
    }

    fn head_is_clear(&self, head: &Head) -> bool {
        let margin = self.clearance();
        let front = head.front_center();
        let l = head.center_distance();
        let samples = 8;
        (0..=samples).all(|k| {
            let t = k as f64 / samples as f64;
            let center = front + head.dir * (l * t);
            let radius = (head.back_radius - head.front_radius).mul_add(t, head.front_radius);
            self.point_is_clear(&center, radius + margin)
        })
    }

    fn point_is_clear(&self, p: &Point3<f64>, radius: f64) -> bool {
        self.mesh.signed_distance(p).map_or(true, |d| d >= radius)
    }

    /// Whether a strut of `radius` from `a` to `b` stays out of the model.
    fn segment_is_clear(&self, a: &Point3<f64>, b: &Point3<f64>, radius: f64) -> bool {
        let length = (b - a).norm();
        let step = (radius * 0.5).max(0.05);
        let n = ((length / step).ceil() as usize).clamp(1, 512);
        (0..=n).all(|k| {
            let p = a + (b - a) * (k as f64 / n as f64);
            self.point_is_clear(&p, radius + self.clearance())
        })
    }

    // ========================================================================
    // Stage 4: ground routing
    // ========================================================================

    /// Lowest Z a bridge or junction may reach on a ground pillar.
    fn pillar_floor(&self) -> f64 {
        self.ground + self.cfg.base_height_mm
    }

    fn route_to_ground(&mut self, heads: &[PlacedHead]) -> SupportResult<()> {
        let min_top = self.pillar_floor() + self.cfg.head_back_radius_mm;
        let mut usable: Vec<Head> = Vec::with_capacity(heads.len());
        for h in heads {
            if pillar_top(&h.head) < min_top {
                warn!(z = h.head.tip.z, "Head too close to the ground, discarded");
            } else {
                usable.push(h.head);
            }
        }
        usable.sort_by(|a, b| {
            let (pa, pb) = (a.junction_point(), b.junction_point());
            pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y)).then(pa.z.total_cmp(&pb.z))
        });

        let mut orphans = Vec::new();
        for cluster in self.cluster(&usable) {
            self.check_cancel()?;
            orphans.extend(self.build_cluster(&cluster));
        }

        for head in orphans {
            self.check_cancel()?;
            let axis = xy(&head.junction_point());
            let crowded = self
                .pillars
                .iter()
                .any(|p| (p.axis - axis).norm() < p.radius + self.cfg.head_back_radius_mm);
            if crowded || !self.ground_pillar_is_clear(&head, self.cfg.pillar_radius(0)) {
                warn!(z = head.tip.z, "No route to the ground, head discarded");
                continue;
            }
            self.add_ground_pillar(head, 0);
        }

        debug!(pillars = self.pillars.len(), "Routed heads to the ground");
        Ok(())
    }

    /// Group heads by XY distance, at most `max_bridges_on_pillar + 1` per
    /// group.
    fn cluster(&self, heads: &[Head]) -> Vec<Vec<Head>> {
        let reach = self.cfg.max_bridge_length_mm;
        let mut taken = vec![false; heads.len()];
        let mut clusters = Vec::new();
        for i in 0..heads.len() {
            if taken[i] {
                continue;
            }
            taken[i] = true;
            let seed = xy(&heads[i].junction_point());
            let mut near: Vec<(f64, usize)> = (i + 1..heads.len())
                .filter(|&j| !taken[j])
                .map(|j| ((xy(&heads[j].junction_point()) - seed).norm(), j))
                .filter(|(d, _)| *d <= reach)
                .collect();
            near.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            near.truncate(self.cfg.max_bridges_on_pillar);

            let mut cluster = vec![heads[i]];
            for (_, j) in near {
                taken[j] = true;
                cluster.push(heads[j]);
            }
            clusters.push(cluster);
        }
        clusters
    }

    /// Give the cluster a pillar and bridge the rest onto it. Returns heads
    /// that could not be bridged.
    fn build_cluster(&mut self, cluster: &[Head]) -> Vec<Head> {
        let sum = cluster
            .iter()
            .fold(Vector2::zeros(), |acc, h| acc + xy(&h.junction_point()).coords);
        let centroid = Point2::from(sum / cluster.len() as f64);
        let mut order: Vec<usize> = (0..cluster.len()).collect();
        order.sort_by(|&a, &b| {
            let da = (xy(&cluster[a].junction_point()) - centroid).norm();
            let db = (xy(&cluster[b].junction_point()) - centroid).norm();
            da.total_cmp(&db).then(a.cmp(&b))
        });

        let widest = self.cfg.pillar_radius(cluster.len() - 1);
        let Some(&main) = order
            .iter()
            .find(|&&i| self.ground_pillar_is_clear(&cluster[i], widest))
        else {
            return cluster.to_vec();
        };

        let head = cluster[main];
        let axis = xy(&head.junction_point());
        let top = pillar_top(&head);

        let mut bridged = Vec::new();
        let mut orphans = Vec::new();
        for &i in order.iter().filter(|&&i| i != main) {
            let other = cluster[i];
            match self.plan_head_bridge(&other, axis, top, widest) {
                Some(z) => bridged.push((other, z)),
                None => orphans.push(other),
            }
        }

        let id = self.add_ground_pillar(head, bridged.len());
        let radius = self.pillars[id].radius;
        for (other, z) in bridged {
            let junction = self.add_junction(id, z);
            let start = other.junction_point();
            self.extra.push(Primitive::Head(other));
            self.extra.push(Primitive::Bridge(bridge_between(
                start,
                other.back_radius,
                junction,
                radius,
                self.cfg.head_back_radius_mm,
            )));
        }
        orphans
    }

    /// Z of the junction a bridge from `head` to the pillar at `axis`
    /// would end in, if such a bridge is allowed.
    fn plan_head_bridge(
        &self,
        head: &Head,
        axis: Point2<f64>,
        pillar_top: f64,
        pillar_radius: f64,
    ) -> Option<f64> {
        let start = head.junction_point();
        let d = (xy(&start) - axis).norm();
        if d < head.back_radius {
            return None;
        }
        let length = d / self.cfg.bridge_slope.cos();
        let z = d.mul_add(-self.cfg.bridge_slope.tan(), start.z);
        let end = Point3::new(axis.x, axis.y, z);
        let ok = length <= self.cfg.max_bridge_length_mm
            && z <= pillar_top
            && z - pillar_radius >= self.pillar_floor()
            && self.segment_is_clear(&start, &end, self.cfg.head_back_radius_mm);
        ok.then_some(z)
    }

    fn ground_pillar_is_clear(&self, head: &Head, radius: f64) -> bool {
        let top = head.junction_point();
        let bottom = Point3::new(top.x, top.y, self.pillar_floor());
        self.segment_is_clear(&top, &bottom, radius)
    }

    fn add_ground_pillar(&mut self, head: Head, bridges: usize) -> usize {
        let radius = self.cfg.pillar_radius(bridges);
        let top = head.junction_point();
        self.extra.push(Primitive::Head(head));
        self.pillars.push(GroundPillar {
            axis: xy(&top),
            top: pillar_top(&head),
            radius,
            junctions: Vec::new(),
        });
        self.pillars.len() - 1
    }

    /// Junction on pillar `id` at `z`, shared with an existing one at the
    /// same height.
    fn add_junction(&mut self, id: usize, z: f64) -> Point3<f64> {
        let pillar = &mut self.pillars[id];
        if !pillar.junctions.iter().any(|j| (j - z).abs() < JUNCTION_EPSILON) {
            pillar.junctions.push(z);
        }
        pillar.at(z)
    }

    // ========================================================================
    // Stage 5: model routing
    // ========================================================================

    fn route_to_model(&mut self, heads: &[PlacedHead]) -> SupportResult<()> {
        let mut routed = 0usize;
        for placed in heads {
            self.check_cancel()?;
            let Some(hit) = placed.model_hit else {
                continue;
            };
            let Some(tail) = self.clear_head(Head::new(hit, Vector3::z(), self.cfg)) else {
                warn!(z = placed.head.tip.z, "No room for a head on the model below, discarded");
                continue;
            };
            let back = placed.head.junction_point();
            let top = Point3::new(back.x, back.y, pillar_top(&placed.head));
            let bottom = tail.junction_point() + Vector3::z() * (tail.back_radius / 2.0);
            let radius = self.cfg.pillar_radius(0);
            if top.z - bottom.z < tail.back_radius
                || !self.segment_is_clear(&back, &tail.junction_point(), radius)
            {
                warn!(z = placed.head.tip.z, "Head too close to the model below, discarded");
                continue;
            }
            self.extra.push(Primitive::Head(placed.head));
            self.extra.push(Primitive::Pillar(Pillar { top, bottom, radius }));
            self.extra.push(Primitive::Head(tail));
            routed += 1;
        }
        debug!(routed, "Routed heads to the model");
        Ok(())
    }

    // ========================================================================
    // Stage 6: interconnect
    // ========================================================================

    /// Brace tall ground pillars against their nearest neighbour.
    fn interconnect(&mut self) {
        let floor = self.pillar_floor();
        let tan = self.cfg.bridge_slope.tan();
        let mut links = 0usize;
        let mut linked: Vec<(usize, usize)> = Vec::new();

        for a in 0..self.pillars.len() {
            if self.pillars[a].top - floor <= self.cfg.max_solo_pillar_height_mm {
                continue;
            }
            let nearest = (0..self.pillars.len())
                .filter(|&b| b != a)
                .map(|b| ((self.pillars[b].axis - self.pillars[a].axis).norm(), b))
                .filter(|(d, _)| *d <= self.cfg.max_pillar_link_distance_mm)
                .min_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
            let Some((d, b)) = nearest else {
                continue;
            };
            let pair = (a.min(b), a.max(b));
            if linked.contains(&pair) || d <= self.pillars[a].radius + self.pillars[b].radius {
                continue;
            }
            linked.push(pair);

            let dz = d * tan;
            let r_max = self.pillars[a].radius.max(self.pillars[b].radius);
            let mut z = self.pillars[a].top.min(self.pillars[b].top) - r_max;
            let mut from_a = true;
            while z - dz - r_max >= floor {
                let (hi, lo) = if from_a { (a, b) } else { (b, a) };
                let start = self.pillars[hi].at(z);
                let end = self.pillars[lo].at(z - dz);
                let radius = self.cfg.head_back_radius_mm;
                if self.segment_is_clear(&start, &end, radius) {
                    let s = self.add_junction(hi, z);
                    let e = self.add_junction(lo, z - dz);
                    self.extra.push(Primitive::Bridge(bridge_between(
                        s,
                        self.pillars[hi].radius,
                        e,
                        self.pillars[lo].radius,
                        radius,
                    )));
                    links += 1;
                }
                from_a = !from_a;
                z -= self.cfg.pillar_cascade_spacing_mm;
            }
        }
        debug!(pairs = linked.len(), bridges = links, "Interconnected pillars");
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn into_primitives(self) -> Vec<Primitive> {
        let base_height = self.cfg.base_height_mm;
        let mut out = self.extra;
        for pillar in &self.pillars {
            let bottom_z = if base_height > 0.0 {
                self.ground + base_height / 2.0
            } else {
                self.ground
            };
            out.push(Primitive::Pillar(Pillar {
                top: pillar.top_point(),
                bottom: pillar.at(bottom_z),
                radius: pillar.radius,
            }));
            if base_height > 0.0 {
                out.push(Primitive::PillarBase(PillarBase {
                    ground: pillar.at(self.ground),
                    bottom_radius: self.cfg.base_radius_mm,
                    top_radius: pillar.radius,
                    height: base_height,
                }));
            }
            out.extend(pillar.junctions.iter().map(|&z| {
                Primitive::Junction(Junction {
                    center: pillar.at(z),
                    radius: pillar.radius,
                })
            }));
        }
        info!(primitives = out.len(), pillars = self.pillars.len(), "Support tree built");
        out
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn xy(p: &Point3<f64>) -> Point2<f64> {
    Point2::new(p.x, p.y)
}

/// Pillars start half a back radius below the back sphere centre.
fn pillar_top(head: &Head) -> f64 {
    head.junction_point().z - head.back_radius / 2.0
}

/// A bridge between two sphere centres, shortened so each end sits half
/// a radius inside its sphere.
fn bridge_between(
    start: Point3<f64>,
    start_radius: f64,
    end: Point3<f64>,
    end_radius: f64,
    radius: f64,
) -> Bridge {
    let dir = (end - start).normalize();
    Bridge {
        start: start + dir * (start_radius / 2.0),
        end: end - dir * (end_radius / 2.0),
        radius,
    }
}
