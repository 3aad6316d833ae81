//! The support tree and its outputs.

// Primitive counts stay far below 2^52
#![allow(clippy::cast_precision_loss)]

use std::sync::OnceLock;

use mesh_index::IndexedMesh;
use mesh_slice::{ExPolygons, MeshSlicer};
use mesh_types::{JobControl, NoControl, TriangleMesh};
use tracing::info;

use crate::builder::TreeBuilder;
use crate::config::SupportConfig;
use crate::error::SupportResult;
use crate::points::SupportPoint;
use crate::primitives::Primitive;

/// Rotation between the tessellations of consecutive primitives, so no two
/// of them line up vertex for vertex.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Supports for one model: heads touching the model, pillars down to the
/// ground or back onto the model, and the bridges and junctions tying them
/// together.
///
/// The tree owns its geometry and is moved rather than cloned. Its mesh is
/// assembled on first request and cached.
///
/// # Example
///
/// ```
/// use mesh_index::IndexedMesh;
/// use mesh_types::{cube, Point3};
/// use sla_supports::{SupportConfig, SupportPoint, SupportTree};
///
/// let index = IndexedMesh::new(&cube(10.0)).unwrap();
/// let points = [SupportPoint::new(Point3::new(0.0, 0.0, 0.0), 0.2)];
/// let tree = SupportTree::new(&points, &index, &SupportConfig::default()).unwrap();
///
/// assert_eq!(tree.pillar_count(), 1);
/// let mesh = tree.merged_mesh();
/// let lowest = mesh.vertices.iter().map(|v| v.position.z).fold(f64::INFINITY, f64::min);
/// assert_eq!(lowest, -10.0);
/// ```
#[derive(Debug, Default)]
pub struct SupportTree {
    primitives: Vec<Primitive>,
    ground_level: f64,
    merged: OnceLock<TriangleMesh>,
}

impl SupportTree {
    /// Build supports for `points` on `mesh`.
    ///
    /// # Errors
    ///
    /// [`SupportError::InvalidConfig`](crate::SupportError::InvalidConfig)
    /// for a contradictory `config`.
    pub fn new(
        points: &[SupportPoint],
        mesh: &IndexedMesh,
        config: &SupportConfig,
    ) -> SupportResult<Self> {
        Self::with_control(points, mesh, config, &NoControl)
    }

    /// Build supports, reporting progress per stage.
    ///
    /// Heads closer than two back radii to an earlier one are dropped, as
    /// are heads that cannot be kept clear of the model or routed anywhere.
    ///
    /// # Errors
    ///
    /// - [`SupportError::InvalidConfig`](crate::SupportError::InvalidConfig)
    ///   for a contradictory `config`.
    /// - [`SupportError::Cancelled`](crate::SupportError::Cancelled) when
    ///   `control` asks to stop.
    pub fn with_control(
        points: &[SupportPoint],
        mesh: &IndexedMesh,
        config: &SupportConfig,
        control: &dyn JobControl,
    ) -> SupportResult<Self> {
        config.validate()?;
        let Some(zmin) = mesh.ground_level() else {
            return Ok(Self::default());
        };
        let ground_level = zmin - config.object_elevation_mm;
        if points.is_empty() {
            return Ok(Self {
                ground_level,
                ..Self::default()
            });
        }

        let primitives = TreeBuilder::new(mesh, config, control, ground_level).build(points)?;
        Ok(Self {
            primitives,
            ground_level,
            merged: OnceLock::new(),
        })
    }

    /// The tree as one closed mesh, assembled once.
    pub fn merged_mesh(&self) -> &TriangleMesh {
        self.merged.get_or_init(|| {
            let mut mesh = TriangleMesh::new();
            for (i, primitive) in self.primitives.iter().enumerate() {
                mesh.merge(&primitive.mesh((i as f64 * GOLDEN_ANGLE) % std::f64::consts::TAU));
            }
            info!(
                vertices = mesh.vertices.len(),
                faces = mesh.faces.len(),
                "Merged support mesh"
            );
            mesh
        })
    }

    /// Slice the tree at the given heights, independent of any model slices.
    ///
    /// # Errors
    ///
    /// [`SupportError::Slice`](crate::SupportError::Slice) for an invalid
    /// closing radius.
    pub fn slice(&self, grid: &[f64], closing_radius: f64) -> SupportResult<Vec<ExPolygons>> {
        let slicer = MeshSlicer::new(self.merged_mesh());
        Ok(slicer.slice(grid, closing_radius, &NoControl)?)
    }

    /// All primitives in build order.
    #[must_use]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Number of heads, including the ones standing on the model.
    #[must_use]
    pub fn head_count(&self) -> usize {
        self.count(|p| matches!(p, Primitive::Head(_)))
    }

    /// Number of pillars.
    #[must_use]
    pub fn pillar_count(&self) -> usize {
        self.count(|p| matches!(p, Primitive::Pillar(_)))
    }

    /// Number of bridges.
    #[must_use]
    pub fn bridge_count(&self) -> usize {
        self.count(|p| matches!(p, Primitive::Bridge(_)))
    }

    /// Z of the plane ground pillars stand on.
    #[must_use]
    pub const fn ground_level(&self) -> f64 {
        self.ground_level
    }

    /// `true` for a tree without primitives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Move the tree out, leaving an empty one behind.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    fn count(&self, pred: impl Fn(&Primitive) -> bool) -> usize {
        self.primitives.iter().filter(|p| pred(p)).count()
    }
}
