//! Support and pad generation for resin (SLA) printing.
//!
//! This umbrella crate re-exports the crates of the SLA pipeline under one
//! roof. Each stage is a pure transformation taking meshes or slices in and
//! handing new meshes or slices out:
//!
//! 1. [`slice`] the model into layers
//! 2. place support points with [`supports::AutoSupports`]
//! 3. grow a [`supports::SupportTree`] from them
//! 4. put a pad under model and supports with [`pad::create_pad`]
//!
//! # Quick Start
//!
//! ```
//! use sla::prelude::*;
//!
//! let model = cube(20.0);
//! let config = SupportConfig::default();
//! let (zmin, zmax) = model.z_range().unwrap();
//!
//! let heights = grid(zmin - config.object_elevation_mm, zmax, 0.05);
//! let slices = slice_mesh(&model, &heights, 0.005).unwrap();
//!
//! let index = IndexedMesh::new(&model).unwrap();
//! let auto = AutoSupportConfig::default().with_head_diameter(2.0 * config.head_front_radius_mm);
//! let points = AutoSupports::new(&index, &slices, &heights, &auto, &NoControl).unwrap();
//!
//! let tree = SupportTree::new(points.output(), &index, &config).unwrap();
//! let supports = tree.merged_mesh();
//! assert!(is_manifold(supports));
//! assert_eq!(supports.bounds().min.z, zmin - config.object_elevation_mm);
//!
//! let pad = create_pad(&pad_blueprint(supports), &pad_blueprint(&model), &PadConfig::default())
//!     .unwrap();
//! assert!(!pad.faces.is_empty());
//! ```
//!
//! # Module Organization
//!
//! - [`types`] - Core data structures: `TriangleMesh`, `Vertex`, `Aabb`, `JobControl`
//! - [`repair`] - Validation, manifold checks, self-intersection detection and repair
//! - [`index`] - Spatial queries: ray casts, closest points, signed distance
//! - [`slice`] - Horizontal slicing and 2D region operations
//! - [`supports`] - Support points and support trees
//! - [`pad`] - Base pads

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

// =============================================================================
// Re-exports
// =============================================================================

/// Core data structures: `TriangleMesh`, `Vertex`, `Aabb`, `JobControl`.
pub use mesh_types as types;

/// Mesh validation and repair.
pub use mesh_repair as repair;

/// Spatial queries over a fixed mesh.
pub use mesh_index as index;

/// Horizontal slicing and 2D region operations.
pub use mesh_slice as slice;

/// Support point placement and support tree synthesis.
pub use sla_supports as supports;

/// Base pad generation.
pub use sla_pad as pad;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for the SLA pipeline.
///
/// # Usage
///
/// ```
/// use sla::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use mesh_types::{
        cube, cuboid, Aabb, FnControl, JobControl, MeshBounds, MeshTopology, NoControl, Point2,
        Point3, TriangleMesh, Vertex,
    };

    // Validity
    pub use mesh_repair::{
        has_self_intersections, is_manifold, needs_repair, repair_mesh, validate_mesh,
        validate_stl, MeshReport, RepairParams,
    };

    // Queries and slicing
    pub use mesh_index::IndexedMesh;
    pub use mesh_slice::{grid, intersection, slice_mesh, ExPolygon, ExPolygons, MeshSlicer};

    // Supports
    pub use sla_supports::{
        remove_bottom_points, AutoSupportConfig, AutoSupports, SupportConfig, SupportPoint,
        SupportTree,
    };

    // Pad
    pub use sla_pad::{create_pad, pad_blueprint, PadConfig};
}

// =============================================================================
// Tests
// =============================================================================
