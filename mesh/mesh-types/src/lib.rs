//! Core mesh types for the SLA support engine.
//!
//! This crate provides the values every stage passes around:
//!
//! - [`TriangleMesh`] - indexed triangle mesh, the input model and every output solid
//! - [`Vertex`] / [`Triangle`] - vertex wrapper and resolved triangle
//! - [`Aabb`] - axis-aligned bounding box
//! - [`JobControl`] - progress and cancellation capability for long stages
//!
//! # Units
//!
//! Coordinates are `f64` millimeters.
//!
//! # Coordinate System
//!
//! Right-handed, Z up. The build plate is a horizontal plane; slicing planes
//! are horizontal. Face winding is **counter-clockwise seen from outside**.
//!
//! # Example
//!
//! ```
//! use mesh_types::{cube, MeshBounds, MeshTopology};
//!
//! let model = cube(20.0);
//! assert_eq!(model.face_count(), 12);
//! assert!((model.bounds().max.z - 20.0).abs() < f64::EPSILON);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod control;
mod mesh;
mod primitives;
mod traits;
mod triangle;
mod vertex;

pub use bounds::Aabb;
pub use control::{FnControl, JobControl, NoControl};
pub use mesh::TriangleMesh;
pub use primitives::{cube, cuboid, unit_cube};
pub use traits::{MeshBounds, MeshTopology};
pub use triangle::Triangle;
pub use vertex::Vertex;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};
