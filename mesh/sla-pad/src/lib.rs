//! Base pads for resin (SLA) prints.
//!
//! A pad is a slab under the model and its supports that keeps the print
//! attached to the build plate. [`pad_blueprint`] projects a model's bottom
//! onto the ground; [`create_pad`] turns that footprint, together with the
//! support footprint, into a closed mesh.
//!
//! # Pad Shapes
//!
//! - **Flat** (`wall_height_mm == 0`): a slab with its top at z = 0 and
//!   sloped sides widening down to z = -`wall_thickness_mm`
//! - **Walled** (`wall_height_mm > 0`): a cavity with its floor at z = 0,
//!   surrounded by a rim rising to z = `wall_height_mm`
//!
//! Either way the pad's Z extent is exactly [`PadConfig::full_height`].
//!
//! # Example
//!
//! ```
//! use mesh_types::{cube, MeshBounds};
//! use sla_pad::{create_pad, pad_blueprint, PadConfig};
//!
//! let footprint = pad_blueprint(&cube(20.0));
//! assert_eq!(footprint.len(), 1);
//!
//! let config = PadConfig::walled(1.0);
//! let pad = create_pad(&[], &footprint, &config).unwrap();
//! let b = pad.bounds();
//! assert!((b.max.z - b.min.z - config.full_height()).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod blueprint;
mod config;
mod error;
mod pad;

pub use blueprint::{pad_blueprint, pad_blueprint_with, BLUEPRINT_HEIGHT, BLUEPRINT_LAYER_HEIGHT};
pub use config::PadConfig;
pub use error::{PadError, PadResult};
pub use pad::create_pad;
