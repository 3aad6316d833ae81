//! Spatial queries over a triangle mesh.
//!
//! [`IndexedMesh`] wraps an immutable snapshot of a [`TriangleMesh`] in a
//! bounding volume hierarchy and answers the questions support generation
//! keeps asking:
//!
//! - where does a ray first hit the surface ([`IndexedMesh::query_ray_hit`])
//! - which surface point is nearest ([`IndexedMesh::closest_point`])
//! - is a point inside the solid ([`IndexedMesh::is_inside`])
//!
//! The index never changes after construction. Mutating the source mesh
//! (for example through `mesh_repair::repair_mesh`) means building a new one.
//!
//! # Example
//!
//! ```
//! use mesh_index::IndexedMesh;
//! use mesh_types::{cube, Point3};
//!
//! let index = IndexedMesh::new(&cube(20.0)).unwrap();
//! let nearest = index.closest_point(&Point3::new(0.0, 0.0, 25.0)).unwrap();
//! assert!((nearest.distance() - 5.0).abs() < 1e-9);
//! ```
//!
//! [`TriangleMesh`]: mesh_types::TriangleMesh

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bvh;
mod error;
mod indexed;
pub mod query;

pub use error::{IndexError, IndexResult};
pub use indexed::{ClosestPoint, IndexedMesh, RayHit};
