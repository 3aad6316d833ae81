//! Support tree parameters.

use std::f64::consts::FRAC_PI_2;

use crate::error::{SupportError, SupportResult};

/// Geometry and routing parameters for [`SupportTree`](crate::SupportTree).
///
/// All lengths are millimeters, all angles radians.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SupportConfig {
    /// Radius of the sphere touching the model.
    pub head_front_radius_mm: f64,

    /// Radius of the sphere joining the head to the rest of the tree.
    pub head_back_radius_mm: f64,

    /// How deep the head tip reaches into the model. Negative values keep
    /// the head that far away from the surface.
    pub head_penetration_mm: f64,

    /// Length of the cone between the two head spheres.
    pub head_width_mm: f64,

    /// Pillar radius growth per fully loaded pillar, relative to the back
    /// radius.
    pub pillar_widening_factor: f64,

    /// Radius of the conical pillar foot at ground level.
    pub base_radius_mm: f64,

    /// Height of the conical pillar foot.
    pub base_height_mm: f64,

    /// Descent angle of bridges below the horizontal.
    pub bridge_slope: f64,

    /// Longest allowed bridge.
    pub max_bridge_length_mm: f64,

    /// Farthest pillar a tall pillar links to.
    pub max_pillar_link_distance_mm: f64,

    /// Gap between the model and the ground.
    pub object_elevation_mm: f64,

    /// Smallest polar angle (from +Z) a head may point at. Heads on
    /// steeper surfaces are tilted down to it.
    pub normal_cutoff_angle: f64,

    /// Bridges a pillar can take besides its own head.
    pub max_bridges_on_pillar: usize,

    /// Ground pillars taller than this get linked to a neighbour.
    pub max_solo_pillar_height_mm: f64,

    /// Vertical distance between cross links of two pillars.
    pub pillar_cascade_spacing_mm: f64,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            head_front_radius_mm: 0.2,
            head_back_radius_mm: 0.5,
            head_penetration_mm: 0.5,
            head_width_mm: 1.0,
            pillar_widening_factor: 0.5,
            base_radius_mm: 2.0,
            base_height_mm: 1.0,
            bridge_slope: std::f64::consts::FRAC_PI_4,
            max_bridge_length_mm: 15.0,
            max_pillar_link_distance_mm: 10.0,
            object_elevation_mm: 10.0,
            normal_cutoff_angle: 150.0_f64.to_radians(),
            max_bridges_on_pillar: 3,
            max_solo_pillar_height_mm: 15.0,
            pillar_cascade_spacing_mm: 8.0,
        }
    }
}

impl SupportConfig {
    /// Model resting on the ground: no elevation, so supports only grow
    /// from overhangs above the bottom.
    #[must_use]
    pub fn on_floor() -> Self {
        Self {
            object_elevation_mm: 0.0,
            ..Default::default()
        }
    }

    /// Set the elevation.
    #[must_use]
    pub const fn with_elevation(mut self, elevation_mm: f64) -> Self {
        self.object_elevation_mm = elevation_mm;
        self
    }

    /// Set the head penetration.
    #[must_use]
    pub const fn with_head_penetration(mut self, penetration_mm: f64) -> Self {
        self.head_penetration_mm = penetration_mm;
        self
    }

    /// Set both head radii.
    #[must_use]
    pub const fn with_head_radii(mut self, front_mm: f64, back_mm: f64) -> Self {
        self.head_front_radius_mm = front_mm;
        self.head_back_radius_mm = back_mm;
        self
    }

    /// Set the pillar foot.
    #[must_use]
    pub const fn with_base(mut self, radius_mm: f64, height_mm: f64) -> Self {
        self.base_radius_mm = radius_mm;
        self.base_height_mm = height_mm;
        self
    }

    /// Distance from the support point to the centre of the back sphere.
    #[must_use]
    pub fn head_length(&self) -> f64 {
        2.0f64.mul_add(self.head_front_radius_mm, self.head_width_mm) + self.head_back_radius_mm
            - self.head_penetration_mm
    }

    /// Radius of a pillar carrying `bridges` bridges.
    #[must_use]
    pub fn pillar_radius(&self, bridges: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let load = if self.max_bridges_on_pillar == 0 {
            0.0
        } else {
            bridges.min(self.max_bridges_on_pillar) as f64 / self.max_bridges_on_pillar as f64
        };
        self.head_back_radius_mm * self.pillar_widening_factor.mul_add(load, 1.0)
    }

    /// Check the parameters for contradictions.
    ///
    /// # Errors
    ///
    /// [`SupportError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> SupportResult<()> {
        let positive = [
            ("head_front_radius_mm", self.head_front_radius_mm),
            ("head_back_radius_mm", self.head_back_radius_mm),
            ("base_radius_mm", self.base_radius_mm),
            ("max_bridge_length_mm", self.max_bridge_length_mm),
            ("max_solo_pillar_height_mm", self.max_solo_pillar_height_mm),
            ("pillar_cascade_spacing_mm", self.pillar_cascade_spacing_mm),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SupportError::invalid(field, value, "finite and > 0"));
            }
        }

        let non_negative = [
            ("head_width_mm", self.head_width_mm),
            ("pillar_widening_factor", self.pillar_widening_factor),
            ("base_height_mm", self.base_height_mm),
            ("max_pillar_link_distance_mm", self.max_pillar_link_distance_mm),
            ("object_elevation_mm", self.object_elevation_mm),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SupportError::invalid(field, value, "finite and >= 0"));
            }
        }

        if !self.head_penetration_mm.is_finite()
            || self.head_penetration_mm >= 2.0 * self.head_front_radius_mm + self.head_width_mm
        {
            return Err(SupportError::invalid(
                "head_penetration_mm",
                self.head_penetration_mm,
                "shorter than the head",
            ));
        }

        if !(self.bridge_slope > 0.0 && self.bridge_slope < FRAC_PI_2) {
            return Err(SupportError::invalid("bridge_slope", self.bridge_slope, "in (0, pi/2)"));
        }

        if !(FRAC_PI_2..=std::f64::consts::PI).contains(&self.normal_cutoff_angle) {
            return Err(SupportError::invalid(
                "normal_cutoff_angle",
                self.normal_cutoff_angle,
                "in [pi/2, pi]",
            ));
        }

        if self.base_radius_mm < self.pillar_radius(self.max_bridges_on_pillar) {
            return Err(SupportError::invalid(
                "base_radius_mm",
                self.base_radius_mm,
                "at least the widest pillar radius",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = SupportConfig::default();
        assert!(cfg.validate().is_ok());
        assert!((cfg.normal_cutoff_angle - 150.0_f64.to_radians()).abs() < 1e-12);
        assert_eq!(cfg.max_bridges_on_pillar, 3);
    }

    #[test]
    fn test_floor_preset() {
        let cfg = SupportConfig::on_floor();
        assert!(cfg.object_elevation_mm.abs() < f64::EPSILON);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_pillar_widening() {
        let cfg = SupportConfig::default();
        assert!((cfg.pillar_radius(0) - 0.5).abs() < 1e-12);
        assert!((cfg.pillar_radius(3) - 0.75).abs() < 1e-12);
        assert!((cfg.pillar_radius(10) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_contradictions_rejected() {
        let err = SupportConfig::default().with_head_radii(0.0, 0.5).validate().unwrap_err();
        assert!(matches!(err, SupportError::InvalidConfig { field: "head_front_radius_mm", .. }));

        let cfg = SupportConfig {
            bridge_slope: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SupportConfig::default().with_base(0.3, 1.0);
        assert!(matches!(
            cfg.validate().unwrap_err(),
            SupportError::InvalidConfig { field: "base_radius_mm", .. }
        ));

        let cfg = SupportConfig::default().with_elevation(-1.0);
        assert!(cfg.validate().is_err());

        let cfg = SupportConfig::default().with_head_penetration(5.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_head_length() {
        let cfg = SupportConfig::default();
        // 0.2 + 0.2 + 1.0 + 0.5 - 0.5
        assert!((cfg.head_length() - 1.4).abs() < 1e-12);
    }
}
