//! SO(3) exponential/logarithm maps and their Jacobians.
//!
//! Rotations are perturbed on the right (local frame): `R ⊕ ω = R · Exp(ω)`,
//! matching how joint velocities of spherical and free joints are expressed.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

use crate::error::ensure_dimension;
use crate::spatial::skew;
use crate::Result;

/// Below this angle the closed forms switch to their Taylor expansions.
const SMALL_ANGLE: f64 = 1e-6;

/// Read a `[w, x, y, z]` quaternion from a 4-element slice, normalising it.
pub fn quaternion_from_slice(q: &[f64]) -> Result<UnitQuaternion<f64>> {
    ensure_dimension("quaternion", 4, q.len())?;
    Ok(read_quaternion(q))
}

/// Write a quaternion as `[w, x, y, z]` into a 4-element slice.
pub fn quaternion_to_slice(q: &UnitQuaternion<f64>, out: &mut [f64]) -> Result<()> {
    ensure_dimension("quaternion", 4, out.len())?;
    write_quaternion(q, out);
    Ok(())
}

/// Unchecked [`quaternion_from_slice`]; `q` has at least four entries.
pub(crate) fn read_quaternion(q: &[f64]) -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]))
}

/// Unchecked [`quaternion_to_slice`]; `out` has at least four entries.
pub(crate) fn write_quaternion(q: &UnitQuaternion<f64>, out: &mut [f64]) {
    out[0] = q.w;
    out[1] = q.i;
    out[2] = q.j;
    out[3] = q.k;
}

/// Exponential map from a rotation vector to a unit quaternion.
#[must_use]
pub fn exp3(omega: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_scaled_axis(*omega)
}

/// Logarithm map from a unit quaternion to a rotation vector with angle in `[0, π]`.
#[must_use]
pub fn log3(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    // q and -q are the same rotation; pick the short way round.
    let (w, v) = if q.w < 0.0 {
        (-q.w, -q.imag())
    } else {
        (q.w, q.imag())
    };
    let n = v.norm();
    if n < SMALL_ANGLE {
        return v * (2.0 / w);
    }
    v * (2.0 * n.atan2(w) / n)
}

/// Right Jacobian of SO(3): `Exp(ω + δ) ≈ Exp(ω) · Exp(Jr(ω) δ)`.
#[must_use]
pub fn right_jacobian(omega: &Vector3<f64>) -> Matrix3<f64> {
    let theta = omega.norm();
    let k = skew(omega);
    let k2 = k * k;
    if theta < SMALL_ANGLE {
        return Matrix3::identity() - 0.5 * k + k2 / 6.0;
    }
    let theta2 = theta * theta;
    Matrix3::identity() - (1.0 - theta.cos()) / theta2 * k
        + (theta - theta.sin()) / (theta2 * theta) * k2
}

/// Inverse of [`right_jacobian`].
#[must_use]
pub fn right_jacobian_inv(omega: &Vector3<f64>) -> Matrix3<f64> {
    let theta = omega.norm();
    let k = skew(omega);
    let k2 = k * k;
    if theta < SMALL_ANGLE {
        return Matrix3::identity() + 0.5 * k + k2 / 12.0;
    }
    let coeff = 1.0 / (theta * theta) - (1.0 + theta.cos()) / (2.0 * theta * theta.sin());
    Matrix3::identity() + 0.5 * k + coeff * k2
}
