//! Pad parameters.

use std::f64::consts::FRAC_PI_2;

use crate::error::{PadError, PadResult};

/// Shape of the pad under a model and its supports.
///
/// All lengths are millimeters, the slope is radians from the horizontal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PadConfig {
    /// Thickness of the slab below z = 0, and width of the wall top.
    pub wall_thickness_mm: f64,

    /// Height of the rim around the cavity. Zero gives a flat pad.
    pub wall_height_mm: f64,

    /// Footprint islands closer than this are joined into one pad.
    pub max_merge_distance_mm: f64,

    /// Steepness of the pad sides.
    pub wall_slope: f64,

    /// Margin added around the footprint.
    pub edge_radius_mm: f64,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            wall_thickness_mm: 2.0,
            wall_height_mm: 0.0,
            max_merge_distance_mm: 50.0,
            wall_slope: std::f64::consts::FRAC_PI_4,
            edge_radius_mm: 1.0,
        }
    }
}

impl PadConfig {
    /// Pad with a rim of the given height around a cavity.
    #[must_use]
    pub fn walled(wall_height_mm: f64) -> Self {
        Self::default().with_wall_height(wall_height_mm)
    }

    /// Set the rim height.
    #[must_use]
    pub const fn with_wall_height(mut self, height_mm: f64) -> Self {
        self.wall_height_mm = height_mm;
        self
    }

    /// Set the slab thickness.
    #[must_use]
    pub const fn with_wall_thickness(mut self, thickness_mm: f64) -> Self {
        self.wall_thickness_mm = thickness_mm;
        self
    }

    /// Set the island merge distance.
    #[must_use]
    pub const fn with_max_merge_distance(mut self, distance_mm: f64) -> Self {
        self.max_merge_distance_mm = distance_mm;
        self
    }

    /// Set the side slope.
    #[must_use]
    pub const fn with_wall_slope(mut self, slope: f64) -> Self {
        self.wall_slope = slope;
        self
    }

    /// Set the footprint margin.
    #[must_use]
    pub const fn with_edge_radius(mut self, radius_mm: f64) -> Self {
        self.edge_radius_mm = radius_mm;
        self
    }

    /// Total Z extent of the pad.
    #[must_use]
    pub fn full_height(&self) -> f64 {
        self.wall_thickness_mm + self.wall_height_mm
    }

    /// `true` when the pad has a rim.
    #[must_use]
    pub fn is_walled(&self) -> bool {
        self.wall_height_mm > 0.0
    }

    /// Check the parameters for contradictions.
    ///
    /// # Errors
    ///
    /// [`PadError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> PadResult<()> {
        if !(self.wall_thickness_mm.is_finite() && self.wall_thickness_mm > 0.0) {
            return Err(PadError::invalid(
                "wall_thickness_mm",
                self.wall_thickness_mm,
                "finite and > 0",
            ));
        }

        let non_negative = [
            ("wall_height_mm", self.wall_height_mm),
            ("max_merge_distance_mm", self.max_merge_distance_mm),
            ("edge_radius_mm", self.edge_radius_mm),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PadError::invalid(field, value, "finite and >= 0"));
            }
        }

        if !(self.wall_slope > 0.0 && self.wall_slope <= FRAC_PI_2) {
            return Err(PadError::invalid("wall_slope", self.wall_slope, "in (0, pi/2]"));
        }

        Ok(())
    }

    /// Horizontal run of a side that drops by `rise`.
    pub(crate) fn run(&self, rise: f64) -> f64 {
        if self.wall_slope >= FRAC_PI_2 {
            0.0
        } else {
            rise / self.wall_slope.tan()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PadConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(!cfg.is_walled());
        assert!((cfg.full_height() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_walled_height() {
        let cfg = PadConfig::walled(1.0);
        assert!(cfg.is_walled());
        assert!((cfg.full_height() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_run() {
        let cfg = PadConfig::default();
        assert!((cfg.run(2.0) - 2.0).abs() < 1e-12);
        let steep = cfg.with_wall_slope(FRAC_PI_2);
        assert!(steep.validate().is_ok());
        assert!(steep.run(2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contradictions_rejected() {
        let err = PadConfig::default().with_wall_thickness(0.0).validate().unwrap_err();
        assert!(matches!(err, PadError::InvalidConfig { field: "wall_thickness_mm", .. }));

        let err = PadConfig::walled(-1.0).validate().unwrap_err();
        assert!(matches!(err, PadError::InvalidConfig { field: "wall_height_mm", .. }));

        assert!(PadConfig::default().with_wall_slope(0.0).validate().is_err());
        assert!(PadConfig::default().with_wall_slope(2.0).validate().is_err());
        assert!(PadConfig::default().with_edge_radius(f64::NAN).validate().is_err());
    }
}
