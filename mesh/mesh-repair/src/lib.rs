//! Mesh validation and repair.
//!
//! This crate provides:
//! - Structural validity checks ([`validate_stl`]) and health reports ([`validate_mesh`])
//! - Manifoldness through shared-vertex adjacency ([`is_manifold`], [`MeshAdjacency`])
//! - A pure "would repair change anything" query ([`needs_repair`])
//! - Idempotent in-place repair ([`repair_mesh`]): invalid and degenerate face
//!   removal, vertex welding, duplicate removal, hole filling, winding fixes
//! - Self-intersection detection ([`detect_self_intersections`])
//!
//! Repair is the only mutating operation of the SLA engine. Spatial indices
//! built from a mesh must be rebuilt after repairing it.
//!
//! # Example
//!
//! ```
//! use mesh_types::unit_cube;
//! use mesh_repair::{is_manifold, needs_repair, repair_mesh, RepairParams};
//!
//! let mut mesh = unit_cube();
//! mesh.faces.pop();
//! assert!(!is_manifold(&mesh));
//! assert!(needs_repair(&mesh));
//!
//! let summary = repair_mesh(&mut mesh, &RepairParams::default());
//! println!("{summary}");
//! assert!(is_manifold(&mesh));
//! assert!(!needs_repair(&mesh));
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod adjacency;
mod error;
mod holes;
pub mod intersect;
mod repair;
mod validate;
pub mod winding;

pub use adjacency::MeshAdjacency;
pub use error::{RepairError, RepairResult};
pub use holes::{detect_holes, fill_holes, BoundaryLoop};
pub use intersect::{
    detect_self_intersections, has_self_intersections, IntersectionParams, SelfIntersectionResult,
};
pub use repair::{
    needs_repair, needs_repair_with, remove_degenerate_triangles, remove_duplicate_faces,
    remove_invalid_faces, remove_unreferenced_vertices, repair_mesh, weld_vertices, RepairParams,
    RepairSummary,
};
pub use validate::{is_manifold, validate_mesh, validate_stl, MeshReport, DEGENERATE_AREA};
pub use winding::{connected_components, fix_winding_order, orient_outward};
