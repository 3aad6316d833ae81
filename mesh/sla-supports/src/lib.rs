//! Support generation for resin (SLA) printing.
//!
//! Two stages: [`AutoSupports`] decides where the model needs to be touched,
//! and [`SupportTree`] grows a printable structure from those points down to
//! the ground or back onto the model.
//!
//! # Features
//!
//! - **Support points**: overhang and island detection on model slices,
//!   sampled at a density derived from the head size
//! - **Tree synthesis**: heads, pillars with conical bases, bridges between
//!   neighbouring heads and cross links between tall pillars
//! - **Output**: the tree as [`Primitive`]s, one merged closed mesh, or
//!   per-layer slices
//!
//! # Example
//!
//! ```
//! use mesh_index::IndexedMesh;
//! use mesh_slice::{grid, slice_mesh};
//! use mesh_types::cube;
//! use sla_supports::{AutoSupportConfig, AutoSupports, SupportConfig, SupportTree};
//!
//! let model = cube(10.0);
//! let index = IndexedMesh::new(&model).unwrap();
//! let heights = grid(0.05, 10.0, 0.5);
//! let slices = slice_mesh(&model, &heights, 0.005).unwrap();
//!
//! let points = AutoSupports::new(
//!     &index,
//!     &slices,
//!     &heights,
//!     &AutoSupportConfig::default(),
//!     &mesh_types::NoControl,
//! )
//! .unwrap();
//! assert!(!points.output().is_empty());
//!
//! let tree = SupportTree::new(points.output(), &index, &SupportConfig::default()).unwrap();
//! assert!(tree.pillar_count() > 0);
//! ```
//!
//! # Coordinate System
//!
//! +Z is up. Supports hang below the model; the ground plane sits
//! `object_elevation_mm` under the model's lowest point.

#![warn(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod builder;
mod config;
mod error;
mod points;
mod primitives;
mod tree;

pub use config::SupportConfig;
pub use error::{SupportError, SupportResult};
pub use points::{remove_bottom_points, AutoSupportConfig, AutoSupports, SupportPoint};
pub use primitives::{Bridge, Head, Junction, Pillar, PillarBase, Primitive};
pub use tree::SupportTree;
