//! Horizontal slicing of triangle meshes and 2D region operations.
//!
//! This crate turns a mesh into per-layer region sets and provides the
//! polygon toolkit the support and pad stages build on.
//!
//! # Features
//!
//! - **Slicing**: [`MeshSlicer`] cuts a mesh at arbitrary heights in parallel,
//!   with progress reporting and cancellation through [`JobControl`]
//! - **Regions**: [`Polygon`] rings and [`ExPolygon`] regions with holes
//! - **Booleans and offsets**: [`union`], [`union_ex`], [`intersection`],
//!   [`difference`], [`offset`] and [`closing`], backed by `geo-clipper`
//!
//! # Example
//!
//! ```
//! use mesh_types::cube;
//! use mesh_slice::{area, grid, intersection, slice_mesh};
//!
//! let a = slice_mesh(&cube(10.0), &grid(1.0, 9.0, 1.0), 0.005).unwrap();
//! assert_eq!(a.len(), 9);
//!
//! // Layers of the same solid overlap completely.
//! let common = intersection(&a[0], &a[1]);
//! assert!((area(&common) - area(&a[0])).abs() < 1e-6);
//! ```
//!
//! # Coordinate System
//!
//! Slicing planes are horizontal (`z = const`). Region contours are
//! counter-clockwise seen from +Z, holes clockwise.
//!
//! [`JobControl`]: mesh_types::JobControl

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod clip;
mod error;
mod polygon;
mod slicer;

pub use clip::{
    area, bounding_box, closing, contains_point, difference, interior_point, intersection, offset,
    union, union_ex, union_polygons, CLIPPER_SCALE,
};
pub use error::{SliceError, SliceResult};
pub use polygon::{BoundingBox, ExPolygon, ExPolygons, Polygon};
pub use slicer::{grid, slice_mesh, MeshSlicer};
