//! State representations.
//!
//! A state `x = [q, v]` stacks a configuration `q` (`nq` coordinates on a
//! manifold) and a velocity `v` (`nv` coordinates). Perturbations of the state
//! live in the tangent space of dimension `ndx = 2 * nv`:
//!
//! ```text
//! dx[0..nv]      = dq   (configuration tangent)
//! dx[nv..2*nv]   = dv
//! ```
//!
//! Residual models hold an `Arc<dyn StateModel>` and never copy the state
//! description.

use nalgebra::{DMatrix, DVector};

use crate::error::ensure_dimension;
use crate::{JointKind, Result};

/// Dimensions and manifold operations of a robot state.
pub trait StateModel: std::fmt::Debug + Send + Sync {
    /// Number of configuration coordinates.
    fn nq(&self) -> usize;

    /// Number of velocity coordinates.
    fn nv(&self) -> usize;

    /// Neutral configuration (zero of every joint).
    fn neutral_configuration(&self) -> DVector<f64>;

    /// `q ⊕ dq` on the configuration manifold.
    fn integrate_configuration(&self, q: &DVector<f64>, dq: &DVector<f64>) -> Result<DVector<f64>>;

    /// `q1 ⊖ q0` on the configuration manifold.
    fn difference_configuration(&self, q0: &DVector<f64>, q1: &DVector<f64>)
        -> Result<DVector<f64>>;

    /// Jacobians of `q ⊕ dq` with respect to `q` (tangent) and `dq`, each `nv × nv`.
    fn jacobian_integrate_configuration(
        &self,
        q: &DVector<f64>,
        dq: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>)>;

    /// Jacobians of `q1 ⊖ q0` with respect to `q0` and `q1`, each `nv × nv`.
    fn jacobian_difference_configuration(
        &self,
        q0: &DVector<f64>,
        q1: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>)>;

    /// Whether every configuration coordinate lives in a flat vector space.
    fn is_euclidean(&self) -> bool;

    /// Total state dimension `nq + nv`.
    fn nx(&self) -> usize {
        self.nq() + self.nv()
    }

    /// Tangent state dimension `2 * nv`.
    fn ndx(&self) -> usize {
        2 * self.nv()
    }

    /// Neutral configuration with zero velocity.
    fn zero(&self) -> DVector<f64> {
        let mut x = DVector::zeros(self.nx());
        x.rows_mut(0, self.nq())
            .copy_from(&self.neutral_configuration());
        x
    }

    /// Configuration block of a state vector.
    fn configuration(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        ensure_dimension("state", self.nx(), x.len())?;
        Ok(x.rows(0, self.nq()).into_owned())
    }

    /// Velocity block of a state vector.
    fn velocity(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        ensure_dimension("state", self.nx(), x.len())?;
        Ok(x.rows(self.nq(), self.nv()).into_owned())
    }

    /// `x ⊕ dx`: configuration integrated on the manifold, velocity added.
    fn integrate(&self, x: &DVector<f64>, dx: &DVector<f64>) -> Result<DVector<f64>> {
        ensure_dimension("state", self.nx(), x.len())?;
        ensure_dimension("state tangent", self.ndx(), dx.len())?;
        let (nq, nv) = (self.nq(), self.nv());

        let q = self.integrate_configuration(
            &x.rows(0, nq).into_owned(),
            &dx.rows(0, nv).into_owned(),
        )?;
        let mut out = DVector::zeros(self.nx());
        out.rows_mut(0, nq).copy_from(&q);
        out.rows_mut(nq, nv)
            .copy_from(&(x.rows(nq, nv) + dx.rows(nv, nv)));
        Ok(out)
    }

    /// `x1 ⊖ x0` in the tangent space.
    fn difference(&self, x0: &DVector<f64>, x1: &DVector<f64>) -> Result<DVector<f64>> {
        ensure_dimension("state", self.nx(), x0.len())?;
        ensure_dimension("state", self.nx(), x1.len())?;
        let (nq, nv) = (self.nq(), self.nv());

        let dq = self.difference_configuration(
            &x0.rows(0, nq).into_owned(),
            &x1.rows(0, nq).into_owned(),
        )?;
        let mut out = DVector::zeros(self.ndx());
        out.rows_mut(0, nv).copy_from(&dq);
        out.rows_mut(nv, nv)
            .copy_from(&(x1.rows(nq, nv) - x0.rows(nq, nv)));
        Ok(out)
    }
}

/// A flat state: `nq == nv` and every operation is plain vector arithmetic.
///
/// # Example
///
/// ```
/// use sim_types::{StateModel, StateVector};
/// use nalgebra::DVector;
///
/// let state = StateVector::new(2);
/// assert_eq!(state.nx(), 4);
///
/// let q = DVector::from_vec(vec![1.0, 2.0]);
/// let dq = DVector::from_vec(vec![0.5, -1.0]);
/// let moved = state.integrate_configuration(&q, &dq).unwrap();
/// assert_eq!(moved, DVector::from_vec(vec![1.5, 1.0]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateVector {
    nv: usize,
}

impl StateVector {
    /// Create a Euclidean state with `nv` configuration and velocity coordinates.
    #[must_use]
    pub const fn new(nv: usize) -> Self {
        Self { nv }
    }
}

impl StateModel for StateVector {
    fn nq(&self) -> usize {
        self.nv
    }

    fn nv(&self) -> usize {
        self.nv
    }

    fn neutral_configuration(&self) -> DVector<f64> {
        DVector::zeros(self.nv)
    }

    fn integrate_configuration(&self, q: &DVector<f64>, dq: &DVector<f64>) -> Result<DVector<f64>> {
        ensure_dimension("configuration", self.nv, q.len())?;
        ensure_dimension("configuration tangent", self.nv, dq.len())?;
        Ok(q + dq)
    }

    fn difference_configuration(
        &self,
        q0: &DVector<f64>,
        q1: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        ensure_dimension("configuration", self.nv, q0.len())?;
        ensure_dimension("configuration", self.nv, q1.len())?;
        Ok(q1 - q0)
    }

    fn jacobian_integrate_configuration(
        &self,
        q: &DVector<f64>,
        dq: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        ensure_dimension("configuration", self.nv, q.len())?;
        ensure_dimension("configuration tangent", self.nv, dq.len())?;
        let eye = DMatrix::<f64>::identity(self.nv, self.nv);
        Ok((eye.clone(), eye))
    }

    fn jacobian_difference_configuration(
        &self,
        q0: &DVector<f64>,
        q1: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        ensure_dimension("configuration", self.nv, q0.len())?;
        ensure_dimension("configuration", self.nv, q1.len())?;
        let eye = DMatrix::<f64>::identity(self.nv, self.nv);
        Ok((-eye.clone(), eye))
    }

    fn is_euclidean(&self) -> bool {
        true
    }
}

/// A multibody state built from a sequence of joints.
///
/// Configuration and velocity coordinates are laid out joint after joint in
/// the order the joints were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMultibody {
    joints: Vec<JointKind>,
    idx_q: Vec<usize>,
    idx_v: Vec<usize>,
    nq: usize,
    nv: usize,
}

impl StateMultibody {
    /// Create a state from an ordered list of joints.
    #[must_use]
    pub fn new(joints: Vec<JointKind>) -> Self {
        let mut idx_q = Vec::with_capacity(joints.len());
        let mut idx_v = Vec::with_capacity(joints.len());
        let (mut nq, mut nv) = (0, 0);
        for joint in &joints {
            idx_q.push(nq);
            idx_v.push(nv);
            nq += joint.nq();
            nv += joint.nv();
        }
        Self {
            joints,
            idx_q,
            idx_v,
            nq,
            nv,
        }
    }

    /// A floating base followed by `n` revolute joints.
    #[must_use]
    pub fn floating_base(n: usize) -> Self {
        let mut joints = vec![JointKind::FreeFlyer];
        joints.extend(std::iter::repeat(JointKind::Revolute).take(n));
        Self::new(joints)
    }

    /// The joints, in coordinate order.
    #[must_use]
    pub fn joints(&self) -> &[JointKind] {
        &self.joints
    }

    fn check_configuration(&self, q: &DVector<f64>) -> Result<()> {
        ensure_dimension("configuration", self.nq, q.len())
    }

    fn check_tangent(&self, dq: &DVector<f64>) -> Result<()> {
        ensure_dimension("configuration tangent", self.nv, dq.len())
    }

    fn block_diagonal<F>(&self, mut block: F) -> (DMatrix<f64>, DMatrix<f64>)
    where
        F: FnMut(usize, JointKind) -> (DMatrix<f64>, DMatrix<f64>),
    {
        let mut first = DMatrix::zeros(self.nv, self.nv);
        let mut second = DMatrix::zeros(self.nv, self.nv);
        for (i, &joint) in self.joints.iter().enumerate() {
            let (a, b) = block(i, joint);
            let (iv, nv) = (self.idx_v[i], joint.nv());
            first.view_mut((iv, iv), (nv, nv)).copy_from(&a);
            second.view_mut((iv, iv), (nv, nv)).copy_from(&b);
        }
        (first, second)
    }
}

impl StateModel for StateMultibody {
    fn nq(&self) -> usize {
        self.nq
    }

    fn nv(&self) -> usize {
        self.nv
    }

    fn neutral_configuration(&self) -> DVector<f64> {
        let mut q = DVector::zeros(self.nq);
        for (i, joint) in self.joints.iter().enumerate() {
            let iq = self.idx_q[i];
            joint.neutral(&mut q.as_mut_slice()[iq..iq + joint.nq()]);
        }
        q
    }

    fn integrate_configuration(&self, q: &DVector<f64>, dq: &DVector<f64>) -> Result<DVector<f64>> {
        self.check_configuration(q)?;
        self.check_tangent(dq)?;
        let mut out = DVector::zeros(self.nq);
        for (i, joint) in self.joints.iter().enumerate() {
            let (iq, iv) = (self.idx_q[i], self.idx_v[i]);
            joint.integrate(
                &q.as_slice()[iq..iq + joint.nq()],
                &dq.as_slice()[iv..iv + joint.nv()],
                &mut out.as_mut_slice()[iq..iq + joint.nq()],
            );
        }
        Ok(out)
    }

    fn difference_configuration(
        &self,
        q0: &DVector<f64>,
        q1: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        self.check_configuration(q0)?;
        self.check_configuration(q1)?;
        let mut out = DVector::zeros(self.nv);
        for (i, joint) in self.joints.iter().enumerate() {
            let (iq, iv) = (self.idx_q[i], self.idx_v[i]);
            joint.difference(
                &q0.as_slice()[iq..iq + joint.nq()],
                &q1.as_slice()[iq..iq + joint.nq()],
                &mut out.as_mut_slice()[iv..iv + joint.nv()],
            );
        }
        Ok(out)
    }

    fn jacobian_integrate_configuration(
        &self,
        q: &DVector<f64>,
        dq: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        self.check_configuration(q)?;
        self.check_tangent(dq)?;
        Ok(self.block_diagonal(|i, joint| {
            let iv = self.idx_v[i];
            joint.jacobian_integrate(&dq.as_slice()[iv..iv + joint.nv()])
        }))
    }

    fn jacobian_difference_configuration(
        &self,
        q0: &DVector<f64>,
        q1: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        self.check_configuration(q0)?;
        self.check_configuration(q1)?;
        Ok(self.block_diagonal(|i, joint| {
            let iq = self.idx_q[i];
            joint.jacobian_difference(
                &q0.as_slice()[iq..iq + joint.nq()],
                &q1.as_slice()[iq..iq + joint.nq()],
            )
        }))
    }

    fn is_euclidean(&self) -> bool {
        self.joints.iter().all(|j| j.is_euclidean())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_dimensions() {
        let state = StateVector::new(3);
        assert_eq!(state.nq(), 3);
        assert_eq!(state.nv(), 3);
        assert_eq!(state.nx(), 6);
        assert_eq!(state.ndx(), 6);
        assert!(state.is_euclidean());
        assert_eq!(state.zero(), DVector::zeros(6));
    }

    #[test]
    fn test_vector_rejects_wrong_dimension() {
        let state = StateVector::new(2);
        let q = DVector::zeros(3);
        let dq = DVector::zeros(2);
        let err = state.integrate_configuration(&q, &dq).unwrap_err();
        assert!(err.is_dimension_mismatch());

        let x = DVector::zeros(5);
        assert!(state.configuration(&x).is_err());
    }

    #[test]
    fn test_multibody_layout() {
        let state = StateMultibody::floating_base(2);
        assert_eq!(state.nq(), 9);
        assert_eq!(state.nv(), 8);
        assert!(!state.is_euclidean());

        let q0 = state.neutral_configuration();
        assert_eq!(q0[3], 1.0);
        assert_eq!(q0[7], 0.0);
    }

    #[test]
    fn test_state_integrate_difference_roundtrip() {
        let state = StateMultibody::new(vec![
            JointKind::FreeFlyer,
            JointKind::ContinuousRevolute,
            JointKind::Prismatic,
        ]);
        let x0 = state.zero();
        let dx = DVector::from_fn(state.ndx(), |i, _| 0.1 * (i as f64 + 1.0) - 0.4);
        let x1 = state.integrate(&x0, &dx).unwrap();
        let back = state.difference(&x0, &x1).unwrap();
        assert_relative_eq!(back, dx, epsilon = 1e-10);
    }

    #[test]
    fn test_multibody_jacobians_are_block_diagonal() {
        let state = StateMultibody::new(vec![JointKind::Revolute, JointKind::Spherical]);
        let q = state.neutral_configuration();
        let dq = DVector::from_vec(vec![0.2, 0.1, -0.3, 0.4]);
        let (jq, jv) = state.jacobian_integrate_configuration(&q, &dq).unwrap();
        assert_eq!(jq.shape(), (4, 4));
        assert_eq!(jq[(0, 0)], 1.0);
        assert_eq!(jq[(0, 1)], 0.0);
        assert_eq!(jv[(1, 0)], 0.0);
        assert_relative_eq!(jv[(0, 0)], 1.0);
    }

    #[test]
    fn test_euclidean_multibody_matches_vector() {
        let mb = StateMultibody::new(vec![JointKind::Revolute, JointKind::Prismatic]);
        let flat = StateVector::new(2);
        let q = DVector::from_vec(vec![0.3, -0.7]);
        let dq = DVector::from_vec(vec![0.1, 0.2]);
        assert_eq!(
            mb.integrate_configuration(&q, &dq).unwrap(),
            flat.integrate_configuration(&q, &dq).unwrap()
        );
        assert_eq!(
            mb.jacobian_difference_configuration(&q, &dq).unwrap(),
            flat.jacobian_difference_configuration(&q, &dq).unwrap()
        );
    }
}
