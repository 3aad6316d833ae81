//! Bounding volume hierarchy over mesh triangles.
//!
//! Median split on the longest axis of the centroid bounds, built in parallel
//! with `rayon::join` above a size threshold. The tree is immutable once
//! built.

use mesh_types::{Aabb, Point3, Triangle, Vector3};
use smallvec::SmallVec;

use crate::query::{point_box_distance_squared, ray_box_entry};

/// Maximum triangles per leaf.
pub(crate) const MAX_LEAF_SIZE: usize = 8;

/// Subtrees at least this large are built on separate rayon tasks.
const PARALLEL_THRESHOLD: usize = 4096;

#[derive(Debug)]
pub(crate) enum BvhNode {
    Leaf {
        bbox: Aabb,
        triangles: SmallVec<[u32; MAX_LEAF_SIZE]>,
    },
    Internal {
        bbox: Aabb,
        left: Box<Self>,
        right: Box<Self>,
    },
}

impl BvhNode {
    fn bbox(&self) -> &Aabb {
        match self {
            Self::Leaf { bbox, .. } | Self::Internal { bbox, .. } => bbox,
        }
    }
}

/// Triangle bounds and centroid, cached for the build.
struct Prim {
    face: u32,
    bbox: Aabb,
    centroid: Point3<f64>,
}

#[derive(Debug, Default)]
pub(crate) struct Bvh {
    root: Option<BvhNode>,
}

impl Bvh {
    /// Build over `triangles`, indexed by position in the slice.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn build(triangles: &[Triangle]) -> Self {
        if triangles.is_empty() {
            return Self::default();
        }
        let prims: Vec<Prim> = triangles
            .iter()
            .enumerate()
            .map(|(i, t)| Prim {
                face: i as u32,
                bbox: Aabb::from_points(t.vertices().iter()),
                centroid: t.centroid(),
            })
            .collect();
        Self {
            root: Some(build_node(prims)),
        }
    }

    /// Nearest triangle hit by the ray, using `hit` to test a single face.
    pub(crate) fn nearest_hit(
        &self,
        origin: &Point3<f64>,
        dir: &Vector3<f64>,
        hit: &impl Fn(u32) -> Option<f64>,
    ) -> Option<(u32, f64)> {
        let root = self.root.as_ref()?;
        let inv_dir = dir.map(|d| 1.0 / d);
        let mut best: Option<(u32, f64)> = None;
        let mut stack: Vec<&BvhNode> = vec![root];

        while let Some(node) = stack.pop() {
            let b = node.bbox();
            let Some(entry) = ray_box_entry(origin, &inv_dir, &b.min, &b.max) else {
                continue;
            };
            if best.is_some_and(|(_, t)| entry > t) {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    for &f in triangles {
                        if let Some(t) = hit(f) {
                            // Ties go to the lower face index for determinism.
                            if best.map_or(true, |(bf, bt)| t < bt || (t == bt && f < bf)) {
                                best = Some((f, t));
                            }
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        best
    }

    /// Every triangle hit by the ray.
    pub(crate) fn all_hits(
        &self,
        origin: &Point3<f64>,
        dir: &Vector3<f64>,
        hit: &impl Fn(u32) -> Option<f64>,
    ) -> Vec<(u32, f64)> {
        let mut out = Vec::new();
        let Some(root) = self.root.as_ref() else {
            return out;
        };
        let inv_dir = dir.map(|d| 1.0 / d);
        let mut stack: Vec<&BvhNode> = vec![root];
        while let Some(node) = stack.pop() {
            let b = node.bbox();
            if ray_box_entry(origin, &inv_dir, &b.min, &b.max).is_none() {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    out.extend(triangles.iter().filter_map(|&f| hit(f).map(|t| (f, t))));
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }

    /// Triangle minimizing `dist_sq`, pruning boxes farther than the best.
    pub(crate) fn nearest(
        &self,
        point: &Point3<f64>,
        dist_sq: &impl Fn(u32) -> f64,
    ) -> Option<(u32, f64)> {
        let root = self.root.as_ref()?;
        let mut best: Option<(u32, f64)> = None;
        let mut stack: Vec<(&BvhNode, f64)> = vec![(root, 0.0)];

        while let Some((node, lower)) = stack.pop() {
            if best.is_some_and(|(_, d)| lower > d) {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    for &f in triangles {
                        let d = dist_sq(f);
                        if best.map_or(true, |(bf, bd)| d < bd || (d == bd && f < bf)) {
                            best = Some((f, d));
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    let dl = point_box_distance_squared(point, &left.bbox().min, &left.bbox().max);
                    let dr =
                        point_box_distance_squared(point, &right.bbox().min, &right.bbox().max);
                    // Visit the closer child first.
                    if dl <= dr {
                        stack.push((right, dr));
                        stack.push((left, dl));
                    } else {
                        stack.push((left, dl));
                        stack.push((right, dr));
                    }
                }
            }
        }
        best
    }

    /// Faces in leaves overlapping `query` that pass `keep`, ascending.
    pub(crate) fn overlapping(&self, query: &Aabb, keep: &impl Fn(u32) -> bool) -> Vec<u32> {
        let mut out = Vec::new();
        let Some(root) = self.root.as_ref() else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !node.bbox().intersects(query) {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    out.extend(triangles.iter().copied().filter(|&f| keep(f)));
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out.sort_unstable();
        out
    }
}

fn build_node(mut prims: Vec<Prim>) -> BvhNode {
    let bbox = prims
        .iter()
        .fold(Aabb::empty(), |acc, p| acc.union(&p.bbox));

    if prims.len() <= MAX_LEAF_SIZE {
        return BvhNode::Leaf {
            bbox,
            triangles: prims.iter().map(|p| p.face).collect(),
        };
    }

    let centroids = Aabb::from_points(prims.iter().map(|p| &p.centroid));
    let size = centroids.size();
    let axis = if size.x >= size.y && size.x >= size.z {
        0
    } else if size.y >= size.z {
        1
    } else {
        2
    };

    let mid = prims.len() / 2;
    prims.select_nth_unstable_by(mid, |a, b| {
        a.centroid[axis]
            .total_cmp(&b.centroid[axis])
            .then(a.face.cmp(&b.face))
    });
    let right_prims = prims.split_off(mid);

    let (left, right) = if right_prims.len() >= PARALLEL_THRESHOLD {
        rayon::join(|| build_node(prims), || build_node(right_prims))
    } else {
        (build_node(prims), build_node(right_prims))
    };

    BvhNode::Internal {
        bbox,
        left: Box::new(left),
        right: Box::new(right),
    }
}
