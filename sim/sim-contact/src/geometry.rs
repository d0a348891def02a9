//! Foot contact geometry.
//!
//! A foot is a rectangular sole rigidly attached to a joint. The sole frame
//! sits at the centre of the rectangle with X along the foot length and Y
//! across its width.

use nalgebra::Vector2;
use sim_types::{FrameId, JointId, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Immutable descriptor of a rectangular foot.
///
/// # Example
///
/// ```
/// use sim_contact::FootGeometry;
/// use sim_types::{FrameId, JointId};
///
/// let foot = FootGeometry::new(FrameId::new(12), JointId::new(6), 0.2, 0.1);
/// assert!(foot.validate().is_ok());
///
/// let half = foot.half_extents();
/// assert!((half.x - 0.1).abs() < 1e-12);
/// assert!((half.y - 0.05).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FootGeometry {
    /// Contact (sole) frame.
    pub frame: FrameId,
    /// Parent joint of the sole frame.
    pub joint: JointId,
    /// Sole extent along the frame X axis (m).
    pub length: f64,
    /// Sole extent along the frame Y axis (m).
    pub width: f64,
}

impl FootGeometry {
    /// Create a foot descriptor.
    #[must_use]
    pub const fn new(frame: FrameId, joint: JointId, length: f64, width: f64) -> Self {
        Self {
            frame,
            joint,
            length,
            width,
        }
    }

    /// Adult humanoid sole (22 cm × 10 cm).
    #[must_use]
    pub const fn humanoid(frame: FrameId, joint: JointId) -> Self {
        Self::new(frame, joint, 0.22, 0.10)
    }

    /// Set the sole dimensions.
    #[must_use]
    pub fn with_dimensions(mut self, length: f64, width: f64) -> Self {
        self.length = length;
        self.width = width;
        self
    }

    /// Half length and half width of the sole.
    #[must_use]
    pub fn half_extents(&self) -> Vector2<f64> {
        Vector2::new(0.5 * self.length, 0.5 * self.width)
    }

    /// Sole area (m²).
    #[must_use]
    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    /// Check that a point expressed in the sole frame lies on the sole.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let half = self.half_extents();
        x.abs() <= half.x && y.abs() <= half.y
    }

    /// Validate the geometry.
    pub fn validate(&self) -> sim_types::Result<()> {
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(SimError::invalid_geometry(format!(
                "foot length must be positive, got {}",
                self.length
            )));
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(SimError::invalid_geometry(format!(
                "foot width must be positive, got {}",
                self.width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn foot() -> FootGeometry {
        FootGeometry::humanoid(FrameId::new(3), JointId::new(1))
    }

    #[test]
    fn test_half_extents() {
        let half = foot().half_extents();
        assert_relative_eq!(half.x, 0.11);
        assert_relative_eq!(half.y, 0.05);
        assert_relative_eq!(foot().area(), 0.022, epsilon = 1e-12);
    }

    #[test]
    fn test_contains() {
        let f = foot();
        assert!(f.contains(0.0, 0.0));
        assert!(f.contains(0.11, -0.05));
        assert!(!f.contains(0.12, 0.0));
        assert!(!f.contains(0.0, -0.06));
    }

    #[test]
    fn test_validation() {
        assert!(foot().validate().is_ok());
        assert!(foot().with_dimensions(0.0, 0.1).validate().is_err());
        assert!(foot().with_dimensions(0.2, -0.1).validate().is_err());

        let err = foot()
            .with_dimensions(f64::NAN, 0.1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidGeometry { .. }));
    }
}
