//! Rigid placements of frames.
//!
//! A [`Placement`] is an element of SE(3): the rotation and translation that
//! map coordinates expressed in a local frame into a parent (usually world)
//! frame. The kinematics engine supplies joint and frame placements per
//! evaluation; this crate only combines them.

use nalgebra::{Isometry3, Matrix3, Point3, Translation3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of an operational frame in the kinematic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameId(pub u64);

impl FrameId {
    /// Create a new frame ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for FrameId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Rigid transform from a local frame to a parent frame.
///
/// # Example
///
/// ```
/// use sim_types::Placement;
/// use nalgebra::{UnitQuaternion, Vector3};
///
/// let placement = Placement::new(
///     UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
///     Vector3::new(1.0, 0.0, 0.0),
/// );
///
/// // Local +X lands on world +Y, shifted by the translation.
/// let world = placement.act_point(&Vector3::x());
/// assert!((world - Vector3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    /// Orientation of the local frame in the parent frame.
    pub rotation: UnitQuaternion<f64>,
    /// Origin of the local frame in parent coordinates.
    pub translation: Vector3<f64>,
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

impl Placement {
    /// The identity placement.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Create a placement from rotation and translation.
    #[must_use]
    pub const fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Pure translation.
    #[must_use]
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation,
        }
    }

    /// Pure rotation.
    #[must_use]
    pub fn from_rotation(rotation: UnitQuaternion<f64>) -> Self {
        Self {
            rotation,
            translation: Vector3::zeros(),
        }
    }

    /// Create a placement from an isometry.
    #[must_use]
    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self {
            rotation: iso.rotation,
            translation: iso.translation.vector,
        }
    }

    /// Convert to an isometry.
    #[must_use]
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    /// Rotation as a 3×3 matrix.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.to_rotation_matrix().into_inner()
    }

    /// Map a point from local to parent coordinates.
    #[must_use]
    pub fn act_point(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.translation + self.rotation * local
    }

    /// Map a point from parent to local coordinates.
    #[must_use]
    pub fn act_inv_point(&self, parent: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse() * (parent - self.translation)
    }

    /// Map a point given as [`Point3`] from local to parent coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.act_point(&local.coords))
    }

    /// Inverse placement (parent to local).
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            rotation: inv_rotation,
            translation: -(inv_rotation * self.translation),
        }
    }

    /// Compose two placements: `self * other`.
    ///
    /// If `other` maps a child frame into `self`'s local frame, the result maps
    /// the child frame into `self`'s parent frame.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.act_point(&other.translation),
        }
    }

    /// Check if the placement contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.translation.iter().all(|x| x.is_finite())
            && self.rotation.coords.iter().all(|x| x.is_finite())
    }
}
