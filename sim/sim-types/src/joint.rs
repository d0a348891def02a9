//! Joint kinds and their configuration manifolds.
//!
//! Each joint contributes `nq` configuration coordinates and `nv` velocity
//! coordinates to the robot state. Joints whose configuration is not a flat
//! vector space (continuous revolute, spherical, free flyer) provide the
//! manifold `integrate`/`difference` operations and their Jacobians.
//!
//! | Kind                 | `nq` | `nv` | Configuration layout         |
//! |----------------------|------|------|------------------------------|
//! | `Revolute`           | 1    | 1    | `[θ]`                        |
//! | `Prismatic`          | 1    | 1    | `[d]`                        |
//! | `ContinuousRevolute` | 2    | 1    | `[cos θ, sin θ]`             |
//! | `Spherical`          | 4    | 3    | `[w, x, y, z]`               |
//! | `FreeFlyer`          | 7    | 6    | `[px, py, pz, w, x, y, z]`   |
//!
//! Free-flyer velocities are `[v (world), ω (local)]`: translation and
//! rotation are integrated independently.

use nalgebra::{DMatrix, Vector3};

use crate::lie::{exp3, log3, read_quaternion, right_jacobian, right_jacobian_inv, write_quaternion};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a joint in the kinematic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointId(pub u64);

impl JointId {
    /// Create a new joint ID.
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

impl From<u64> for JointId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Joint({})", self.0)
    }
}

/// Kind of joint, which fixes its configuration manifold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointKind {
    /// Bounded revolute joint, angle stored directly.
    Revolute,
    /// Prismatic joint.
    Prismatic,
    /// Unbounded revolute joint stored on the unit circle.
    ContinuousRevolute,
    /// Ball joint stored as a unit quaternion.
    Spherical,
    /// Floating base: translation plus unit quaternion.
    FreeFlyer,
}

impl JointKind {
    /// Number of configuration coordinates.
    #[must_use]
    pub const fn nq(self) -> usize {
        match self {
            Self::Revolute | Self::Prismatic => 1,
            Self::ContinuousRevolute => 2,
            Self::Spherical => 4,
            Self::FreeFlyer => 7,
        }
    }

    /// Number of velocity (tangent) coordinates.
    #[must_use]
    pub const fn nv(self) -> usize {
        match self {
            Self::Revolute | Self::Prismatic | Self::ContinuousRevolute => 1,
            Self::Spherical => 3,
            Self::FreeFlyer => 6,
        }
    }

    /// Whether the configuration space is a flat vector space.
    #[must_use]
    pub const fn is_euclidean(self) -> bool {
        matches!(self, Self::Revolute | Self::Prismatic)
    }

    // The slice primitives below expect blocks already sized by
    // `StateMultibody`, which validates whole vectors first.

    /// Write the neutral configuration into `out` (`nq` entries).
    pub(crate) fn neutral(self, out: &mut [f64]) {
        out.fill(0.0);
        match self {
            Self::Revolute | Self::Prismatic => {}
            Self::ContinuousRevolute | Self::Spherical => out[0] = 1.0,
            Self::FreeFlyer => out[3] = 1.0,
        }
    }

    /// `out = q ⊕ dq`.
    pub(crate) fn integrate(self, q: &[f64], dq: &[f64], out: &mut [f64]) {
        match self {
            Self::Revolute | Self::Prismatic => out[0] = q[0] + dq[0],
            Self::ContinuousRevolute => {
                let theta = q[1].atan2(q[0]) + dq[0];
                out[0] = theta.cos();
                out[1] = theta.sin();
            }
            Self::Spherical => {
                let next = read_quaternion(q) * exp3(&Vector3::new(dq[0], dq[1], dq[2]));
                write_quaternion(&next, out);
            }
            Self::FreeFlyer => {
                for k in 0..3 {
                    out[k] = q[k] + dq[k];
                }
                Self::Spherical.integrate(&q[3..7], &dq[3..6], &mut out[3..7]);
            }
        }
    }

    /// `out = q1 ⊖ q0`, the tangent vector taking `q0` to `q1`.
    pub(crate) fn difference(self, q0: &[f64], q1: &[f64], out: &mut [f64]) {
        match self {
            Self::Revolute | Self::Prismatic => out[0] = q1[0] - q0[0],
            Self::ContinuousRevolute => {
                // Angle of q1 relative to q0 on the unit circle.
                let cross = q0[0] * q1[1] - q0[1] * q1[0];
                let dot = q0[0] * q1[0] + q0[1] * q1[1];
                out[0] = cross.atan2(dot);
            }
            Self::Spherical => {
                let relative = read_quaternion(q0).inverse() * read_quaternion(q1);
                out[..3].copy_from_slice(log3(&relative).as_slice());
            }
            Self::FreeFlyer => {
                for k in 0..3 {
                    out[k] = q1[k] - q0[k];
                }
                Self::Spherical.difference(&q0[3..7], &q1[3..7], &mut out[3..6]);
            }
        }
    }

    /// Jacobians of [`JointKind::integrate`] with respect to `q` (tangent) and `dq`.
    #[must_use]
    pub(crate) fn jacobian_integrate(self, dq: &[f64]) -> (DMatrix<f64>, DMatrix<f64>) {
        let nv = self.nv();
        match self {
            Self::Revolute | Self::Prismatic | Self::ContinuousRevolute => {
                (DMatrix::<f64>::identity(nv, nv), DMatrix::<f64>::identity(nv, nv))
            }
            Self::Spherical => {
                let omega = Vector3::new(dq[0], dq[1], dq[2]);
                // Perturbing q on the right is carried through Exp(ω) by its adjoint.
                let jq = exp3(&omega).to_rotation_matrix().into_inner().transpose();
                let jv = right_jacobian(&omega);
                (
                    DMatrix::from_column_slice(3, 3, jq.as_slice()),
                    DMatrix::from_column_slice(3, 3, jv.as_slice()),
                )
            }
            Self::FreeFlyer => {
                let (rq, rv) = Self::Spherical.jacobian_integrate(&dq[3..6]);
                let mut jq = DMatrix::<f64>::identity(6, 6);
                let mut jv = DMatrix::<f64>::identity(6, 6);
                jq.view_mut((3, 3), (3, 3)).copy_from(&rq);
                jv.view_mut((3, 3), (3, 3)).copy_from(&rv);
                (jq, jv)
            }
        }
    }

    /// Jacobians of [`JointKind::difference`] with respect to `q0` and `q1`.
    #[must_use]
    pub(crate) fn jacobian_difference(
        self,
        q0: &[f64],
        q1: &[f64],
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let nv = self.nv();
        match self {
            Self::Revolute | Self::Prismatic | Self::ContinuousRevolute => {
                (-DMatrix::<f64>::identity(nv, nv), DMatrix::<f64>::identity(nv, nv))
            }
            Self::Spherical => {
                let mut d = [0.0; 3];
                self.difference(q0, q1, &mut d);
                let d = Vector3::new(d[0], d[1], d[2]);
                let j1 = right_jacobian_inv(&d);
                let j0 = -right_jacobian_inv(&(-d));
                (
                    DMatrix::from_column_slice(3, 3, j0.as_slice()),
                    DMatrix::from_column_slice(3, 3, j1.as_slice()),
                )
            }
            Self::FreeFlyer => {
                let (r0, r1) = Self::Spherical.jacobian_difference(&q0[3..7], &q1[3..7]);
                let mut j0 = -DMatrix::<f64>::identity(6, 6);
                let mut j1 = DMatrix::<f64>::identity(6, 6);
                j0.view_mut((3, 3), (3, 3)).copy_from(&r0);
                j1.view_mut((3, 3), (3, 3)).copy_from(&r1);
                (j0, j1)
            }
        }
    }
}

impl std::fmt::Display for JointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Revolute => write!(f, "revolute"),
            Self::Prismatic => write!(f, "prismatic"),
            Self::ContinuousRevolute => write!(f, "continuous revolute"),
            Self::Spherical => write!(f, "spherical"),
            Self::FreeFlyer => write!(f, "free flyer"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const KINDS: [JointKind; 5] = [
        JointKind::Revolute,
        JointKind::Prismatic,
        JointKind::ContinuousRevolute,
        JointKind::Spherical,
        JointKind::FreeFlyer,
    ];

    fn sample_configuration(kind: JointKind) -> Vec<f64> {
        let mut q = vec![0.0; kind.nq()];
        let mut neutral = vec![0.0; kind.nq()];
        kind.neutral(&mut neutral);
        let dq: Vec<f64> = (0..kind.nv()).map(|i| 0.3 + 0.2 * i as f64).collect();
        kind.integrate(&neutral, &dq, &mut q);
        q
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(JointKind::Spherical.nq(), 4);
        assert_eq!(JointKind::Spherical.nv(), 3);
        assert_eq!(JointKind::FreeFlyer.nq(), 7);
        assert_eq!(JointKind::FreeFlyer.nv(), 6);
        assert!(JointKind::Revolute.is_euclidean());
        assert!(!JointKind::ContinuousRevolute.is_euclidean());
    }

    #[test]
    fn test_difference_inverts_integrate() {
        for kind in KINDS {
            let q = sample_configuration(kind);
            let dq: Vec<f64> = (0..kind.nv()).map(|i| -0.1 + 0.05 * i as f64).collect();
            let mut moved = vec![0.0; kind.nq()];
            kind.integrate(&q, &dq, &mut moved);
            let mut back = vec![0.0; kind.nv()];
            kind.difference(&q, &moved, &mut back);
            for (a, b) in back.iter().zip(&dq) {
                assert_relative_eq!(*a, *b, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_continuous_revolute_wraps() {
        let kind = JointKind::ContinuousRevolute;
        let q0 = [(3.0_f64).cos(), (3.0_f64).sin()];
        let q1 = [(-3.0_f64).cos(), (-3.0_f64).sin()];
        let mut d = [0.0];
        kind.difference(&q0, &q1, &mut d);
        // Shortest way from 3 rad to -3 rad crosses π.
        assert_relative_eq!(d[0], 2.0 * std::f64::consts::PI - 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_difference_matches_finite_differences() {
        let eps = 1e-6;
        for kind in KINDS {
            let q0 = sample_configuration(kind);
            let mut q1 = vec![0.0; kind.nq()];
            let step: Vec<f64> = (0..kind.nv()).map(|i| 0.4 - 0.1 * i as f64).collect();
            kind.integrate(&q0, &step, &mut q1);

            let (_, j1) = kind.jacobian_difference(&q0, &q1);
            for col in 0..kind.nv() {
                let mut e = vec![0.0; kind.nv()];
                e[col] = eps;
                let mut plus = vec![0.0; kind.nq()];
                kind.integrate(&q1, &e, &mut plus);
                e[col] = -eps;
                let mut minus = vec![0.0; kind.nq()];
                kind.integrate(&q1, &e, &mut minus);

                let mut d_plus = vec![0.0; kind.nv()];
                let mut d_minus = vec![0.0; kind.nv()];
                kind.difference(&q0, &plus, &mut d_plus);
                kind.difference(&q0, &minus, &mut d_minus);
                for row in 0..kind.nv() {
                    let fd = (d_plus[row] - d_minus[row]) / (2.0 * eps);
                    assert_relative_eq!(j1[(row, col)], fd, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_jacobian_integrate_matches_finite_differences() {
        let eps = 1e-6;
        for kind in KINDS {
            let q = sample_configuration(kind);
            let dq: Vec<f64> = (0..kind.nv()).map(|i| 0.2 + 0.15 * i as f64).collect();
            let mut base = vec![0.0; kind.nq()];
            kind.integrate(&q, &dq, &mut base);
            let (jq, jv) = kind.jacobian_integrate(&dq);

            for col in 0..kind.nv() {
                // Perturb q on its tangent space.
                let mut e = vec![0.0; kind.nv()];
                e[col] = eps;
                let mut q_plus = vec![0.0; kind.nq()];
                kind.integrate(&q, &e, &mut q_plus);
                let mut out = vec![0.0; kind.nq()];
                kind.integrate(&q_plus, &dq, &mut out);
                let mut d = vec![0.0; kind.nv()];
                kind.difference(&base, &out, &mut d);
                for row in 0..kind.nv() {
                    assert_relative_eq!(jq[(row, col)], d[row] / eps, epsilon = 1e-5);
                }

                // Perturb dq directly.
                let mut dq_plus = dq.clone();
                dq_plus[col] += eps;
                kind.integrate(&q, &dq_plus, &mut out);
                kind.difference(&base, &out, &mut d);
                for row in 0..kind.nv() {
                    assert_relative_eq!(jv[(row, col)], d[row] / eps, epsilon = 1e-5);
                }
            }
        }
    }
}
