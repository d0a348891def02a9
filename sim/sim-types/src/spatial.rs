//! Spatial force algebra.
//!
//! Forces follow Featherstone's convention: a 6D force vector is stacked as
//! `[τ (3), f (3)]`, torque first, linear force second. Jacobians of spatial
//! forces (`6 × n` matrices) use the same row layout.
//!
//! Under a rigid placement `M = (R, p)` forces transform contravariantly:
//!
//! ```text
//! f' = R f
//! τ' = R τ + p × (R f)
//! ```

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::Placement;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row offset of the angular (torque) block in a spatial force vector.
pub const ANGULAR: usize = 0;

/// Row offset of the linear (force) block in a spatial force vector.
pub const LINEAR: usize = 3;

/// Skew-symmetric matrix `[v]×` such that `[v]× w = v × w`.
#[must_use]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// A force/torque pair acting at the origin of the frame it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialForce {
    /// Linear force (N).
    pub linear: Vector3<f64>,
    /// Torque about the frame origin (N·m).
    pub angular: Vector3<f64>,
}

impl Default for SpatialForce {
    fn default() -> Self {
        Self::zero()
    }
}

impl SpatialForce {
    /// Create a spatial force from its linear and angular parts.
    #[must_use]
    pub const fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }

    /// The zero force.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            linear: Vector3::zeros(),
            angular: Vector3::zeros(),
        }
    }

    /// Build from a stacked `[τ, f]` vector.
    #[must_use]
    pub fn from_vector(v: &Vector6<f64>) -> Self {
        Self {
            linear: v.fixed_rows::<3>(LINEAR).into_owned(),
            angular: v.fixed_rows::<3>(ANGULAR).into_owned(),
        }
    }

    /// Stack into a `[τ, f]` vector.
    #[must_use]
    pub fn to_vector(&self) -> Vector6<f64> {
        let mut v = Vector6::zeros();
        v.fixed_rows_mut::<3>(ANGULAR).copy_from(&self.angular);
        v.fixed_rows_mut::<3>(LINEAR).copy_from(&self.linear);
        v
    }

    /// Check if both parts are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear.iter().chain(self.angular.iter()).all(|x| x.is_finite())
    }
}

impl std::ops::Add for SpatialForce {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.linear + rhs.linear, self.angular + rhs.angular)
    }
}

impl std::ops::Neg for SpatialForce {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.linear, -self.angular)
    }
}

impl Placement {
    /// Re-express a force given in this placement's local frame in its parent
    /// frame.
    ///
    /// # Example
    ///
    /// ```
    /// use sim_types::{Placement, SpatialForce};
    /// use nalgebra::Vector3;
    ///
    /// let lever = Placement::from_translation(Vector3::new(1.0, 0.0, 0.0));
    /// let push = SpatialForce::new(Vector3::new(0.0, 0.0, 10.0), Vector3::zeros());
    ///
    /// let about_parent = lever.act_force(&push);
    /// assert_eq!(about_parent.linear, push.linear);
    /// assert_eq!(about_parent.angular, Vector3::new(0.0, -10.0, 0.0));
    /// ```
    #[must_use]
    pub fn act_force(&self, local: &SpatialForce) -> SpatialForce {
        let linear = self.rotation * local.linear;
        let angular = self.rotation * local.angular + self.translation.cross(&linear);
        SpatialForce { linear, angular }
    }

    /// Re-express a force given in the parent frame in the local frame.
    #[must_use]
    pub fn act_inv_force(&self, parent: &SpatialForce) -> SpatialForce {
        let inv = self.rotation.inverse();
        SpatialForce {
            linear: inv * parent.linear,
            angular: inv * (parent.angular - self.translation.cross(&parent.linear)),
        }
    }

    /// Matrix form of [`Placement::act_force`] acting on `[τ, f]` vectors.
    ///
    /// ```text
    /// [τ']   [R   [p]×R] [τ]
    /// [f'] = [0     R  ] [f]
    /// ```
    #[must_use]
    pub fn force_action_matrix(&self) -> Matrix6<f64> {
        let rot = self.rotation_matrix();
        let mut m = Matrix6::zeros();
        m.fixed_view_mut::<3, 3>(ANGULAR, ANGULAR).copy_from(&rot);
        m.fixed_view_mut::<3, 3>(ANGULAR, LINEAR)
            .copy_from(&(skew(&self.translation) * rot));
        m.fixed_view_mut::<3, 3>(LINEAR, LINEAR).copy_from(&rot);
        m
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn sample_force() -> SpatialForce {
        SpatialForce::new(Vector3::new(1.0, -2.0, 9.0), Vector3::new(0.3, 0.1, -0.5))
    }

    fn sample_placement() -> Placement {
        Placement::new(
            UnitQuaternion::from_euler_angles(0.2, 0.5, -0.9),
            Vector3::new(0.1, 0.4, -0.3),
        )
    }

    #[test]
    fn test_identity_transform_is_noop() {
        let f = sample_force();
        let out = Placement::identity().act_force(&f);
        assert_eq!(out, f);
    }

    #[test]
    fn test_translation_adds_moment() {
        let m = Placement::from_translation(Vector3::new(0.0, 2.0, 0.0));
        let f = SpatialForce::new(Vector3::new(0.0, 0.0, 5.0), Vector3::zeros());
        let out = m.act_force(&f);
        assert_relative_eq!(out.linear, f.linear);
        assert_relative_eq!(out.angular, Vector3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotation_only_rotates_both_parts() {
        let rot = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let m = Placement::from_rotation(rot);
        let f = SpatialForce::new(Vector3::x(), Vector3::x());
        let out = m.act_force(&f);
        assert_relative_eq!(out.linear, Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(out.angular, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_act_inv_undoes_act() {
        let m = sample_placement();
        let f = sample_force();
        let back = m.act_inv_force(&m.act_force(&f));
        assert_relative_eq!(back.linear, f.linear, epsilon = 1e-12);
        assert_relative_eq!(back.angular, f.angular, epsilon = 1e-12);
    }

    #[test]
    fn test_action_matrix_matches_act_force() {
        let m = sample_placement();
        let f = sample_force();
        let via_matrix = SpatialForce::from_vector(&(m.force_action_matrix() * f.to_vector()));
        let direct = m.act_force(&f);
        assert_relative_eq!(via_matrix.linear, direct.linear, epsilon = 1e-12);
        assert_relative_eq!(via_matrix.angular, direct.angular, epsilon = 1e-12);
    }

    #[test]
    fn test_composition_of_transforms() {
        let a = sample_placement();
        let b = Placement::new(
            UnitQuaternion::from_euler_angles(-0.3, 0.0, 0.7),
            Vector3::new(1.0, 0.0, 0.5),
        );
        let f = sample_force();
        let chained = a.act_force(&b.act_force(&f));
        let composed = a.compose(&b).act_force(&f);
        assert_relative_eq!(chained.linear, composed.linear, epsilon = 1e-12);
        assert_relative_eq!(chained.angular, composed.angular, epsilon = 1e-12);
    }

    #[test]
    fn test_skew_matches_cross() {
        let a = Vector3::new(0.3, -1.2, 2.0);
        let b = Vector3::new(-0.5, 0.8, 0.1);
        assert_relative_eq!(skew(&a) * b, a.cross(&b), epsilon = 1e-12);
    }
}
