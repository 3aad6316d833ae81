//! Ground footprint of a model.

use mesh_slice::{grid, slice_mesh, union_ex, ExPolygons};
use mesh_types::TriangleMesh;
use tracing::debug;

use crate::error::{PadError, PadResult};

/// Height of the model bottom that contributes to the footprint.
pub const BLUEPRINT_HEIGHT: f64 = 0.1;

/// Layer step used to sample that bottom band.
pub const BLUEPRINT_LAYER_HEIGHT: f64 = 0.05;

const CLOSING_RADIUS: f64 = 0.005;

/// Footprint of the lowest [`BLUEPRINT_HEIGHT`] of `mesh`.
///
/// Empty only for an empty mesh.
#[must_use]
pub fn pad_blueprint(mesh: &TriangleMesh) -> ExPolygons {
    // Fixed parameters are valid and no control is involved.
    pad_blueprint_with(mesh, BLUEPRINT_HEIGHT, BLUEPRINT_LAYER_HEIGHT).unwrap_or_default()
}

/// Union of the slices of the lowest `height` of `mesh`, taken every
/// `layer_height`.
///
/// # Errors
///
/// [`PadError::InvalidConfig`] for a non-positive `height` or
/// `layer_height`.
pub fn pad_blueprint_with(
    mesh: &TriangleMesh,
    height: f64,
    layer_height: f64,
) -> PadResult<ExPolygons> {
    if !(height.is_finite() && height > 0.0) {
        return Err(PadError::invalid("height", height, "finite and > 0"));
    }
    if !(layer_height.is_finite() && layer_height > 0.0) {
        return Err(PadError::invalid("layer_height", layer_height, "finite and > 0"));
    }
    let Some((zmin, zmax)) = mesh.z_range() else {
        return Ok(Vec::new());
    };

    // A plane through the bottom face would cut nothing, start one step up,
    // or halfway up a mesh thinner than that.
    let step = layer_height.min(height);
    let start = (zmin + step).min(0.5 * (zmin + zmax));
    let heights = grid(start, zmin + height, step);
    let layers = slice_mesh(mesh, &heights, CLOSING_RADIUS)?;
    let all: ExPolygons = layers.into_iter().flatten().collect();
    let footprint = union_ex(&all);
    debug!(
        layers = heights.len(),
        regions = footprint.len(),
        "Pad blueprint"
    );
    Ok(footprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_slice::area;
    use mesh_types::{cube, cuboid, Point3, Vector3};

    #[test]
    fn test_cube_footprint() {
        let footprint = pad_blueprint(&cube(20.0));
        assert_eq!(footprint.len(), 1);
        assert!(footprint[0].holes.is_empty());
        assert!((area(&footprint) - 400.0).abs() < 0.1);
    }

    #[test]
    fn test_footprint_follows_lifted_mesh() {
        let mut mesh = cube(10.0);
        mesh.translate(Vector3::new(0.0, 0.0, 7.5));
        let footprint = pad_blueprint(&mesh);
        assert!((area(&footprint) - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_only_bottom_band_counts() {
        // A narrow foot under a wide top: only the foot is in the footprint.
        let mut mesh = cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 1.0));
        mesh.merge(&cuboid(
            Point3::new(-5.0, -5.0, 1.0),
            Point3::new(7.0, 7.0, 3.0),
        ));
        let footprint = pad_blueprint(&mesh);
        assert!((area(&footprint) - 4.0).abs() < 0.05);

        let tall = pad_blueprint_with(&mesh, 2.0, 0.5).unwrap();
        assert!(area(&tall) > 100.0);
    }

    #[test]
    fn test_separate_feet() {
        let mut mesh = cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 5.0));
        mesh.merge(&cuboid(Point3::new(10.0, 0.0, 0.0), Point3::new(12.0, 2.0, 5.0)));
        assert_eq!(pad_blueprint(&mesh).len(), 2);
    }

    #[test]
    fn test_thin_plate_has_footprint() {
        let plate = cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 0.03));
        let footprint = pad_blueprint(&plate);
        assert_eq!(footprint.len(), 1);
        assert!((area(&footprint) - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_empty_mesh() {
        assert!(pad_blueprint(&TriangleMesh::new()).is_empty());
    }

    #[test]
    fn test_invalid_band() {
        let mesh = cube(5.0);
        assert!(matches!(
            pad_blueprint_with(&mesh, 0.0, 0.05),
            Err(PadError::InvalidConfig { field: "height", .. })
        ));
        assert!(matches!(
            pad_blueprint_with(&mesh, 0.1, -1.0),
            Err(PadError::InvalidConfig { field: "layer_height", .. })
        ));
    }
}
