//! Smooth one-norm activation.

use nalgebra::DVector;
use sim_types::{Result, SimError};

use super::{check_inputs, Activation, ActivationData};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `a(r) = Σ sqrt(ε + rᵢ²)`, a differentiable stand-in for `‖r‖₁`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothAbs {
    nr: usize,
    eps: f64,
}

impl SmoothAbs {
    /// Create a smooth one-norm with smoothing `eps > 0`.
    pub fn new(nr: usize, eps: f64) -> Result<Self> {
        if !eps.is_finite() || eps <= 0.0 {
            return Err(SimError::invalid_config(format!(
                "smooth-abs eps must be positive, got {eps}"
            )));
        }
        Ok(Self { nr, eps })
    }

    /// Smoothing parameter.
    #[must_use]
    pub fn eps(&self) -> f64 {
        self.eps
    }
}

impl Activation for SmoothAbs {
    fn nr(&self) -> usize {
        self.nr
    }

    fn calc(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr, data, r)?;
        data.value = r.iter().map(|ri| (self.eps + ri * ri).sqrt()).sum();
        Ok(())
    }

    fn calc_diff(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr, data, r)?;
        data.hessian.fill(0.0);
        for (i, ri) in r.iter().enumerate() {
            let s = self.eps + ri * ri;
            let root = s.sqrt();
            data.gradient[i] = ri / root;
            data.hessian[(i, i)] = self.eps / (s * root);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::activation::tests::check_derivatives;
    use approx::assert_relative_eq;

    #[test]
    fn test_approaches_one_norm() {
        let act = SmoothAbs::new(3, 1e-12).unwrap();
        let mut data = act.create_data();
        let r = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        act.calc(&mut data, &r).unwrap();
        assert_relative_eq!(data.value, 3.5, epsilon = 1e-9);
    }

    #[test]
    fn test_smooth_at_zero() {
        let act = SmoothAbs::new(1, 1e-2).unwrap();
        let mut data = act.create_data();
        let r = DVector::zeros(1);
        act.calc_diff(&mut data, &r).unwrap();
        assert_relative_eq!(data.gradient[0], 0.0);
        assert_relative_eq!(data.hessian[(0, 0)], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smooth_abs_derivatives() {
        let act = SmoothAbs::new(3, 0.1).unwrap();
        check_derivatives(&act, &DVector::from_vec(vec![0.2, -0.4, 1.3]), 1e-6);
    }

    #[test]
    fn test_rejects_non_positive_eps() {
        assert!(SmoothAbs::new(2, 0.0).is_err());
        assert!(SmoothAbs::new(2, -1.0).is_err());
    }
}
