//! Quadratic activations.

use nalgebra::{DMatrix, DVector};
use sim_types::{Result, SimError};

use super::{check_inputs, Activation, ActivationData};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unit quadratic activation: `a(r) = ½ rᵀr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quadratic {
    nr: usize,
}

impl Quadratic {
    /// Create a quadratic activation for an `nr`-dimensional residual.
    #[must_use]
    pub const fn new(nr: usize) -> Self {
        Self { nr }
    }
}

impl Activation for Quadratic {
    fn nr(&self) -> usize {
        self.nr
    }

    fn calc(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr, data, r)?;
        data.value = 0.5 * r.norm_squared();
        Ok(())
    }

    fn calc_diff(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr, data, r)?;
        data.gradient.copy_from(r);
        data.hessian.fill_with_identity();
        Ok(())
    }
}

/// Weighted quadratic activation: `a(r) = ½ rᵀ diag(w) r`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightedQuadratic {
    weights: DVector<f64>,
}

impl WeightedQuadratic {
    /// Create a weighted quadratic activation.
    ///
    /// Weights must be finite and non-negative.
    pub fn new(weights: DVector<f64>) -> Result<Self> {
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(SimError::invalid_config(format!(
                "activation weights must be finite and non-negative, got {w}"
            )));
        }
        Ok(Self { weights })
    }

    /// The weights.
    #[must_use]
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }
}

impl Activation for WeightedQuadratic {
    fn nr(&self) -> usize {
        self.weights.len()
    }

    fn calc(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr(), data, r)?;
        data.value = 0.5 * r.dot(&self.weights.component_mul(r));
        Ok(())
    }

    fn calc_diff(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr(), data, r)?;
        data.gradient.copy_from(&self.weights.component_mul(r));
        data.hessian.copy_from(&DMatrix::from_diagonal(&self.weights));
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
    fn test_quadratic_value() {
        let act = Quadratic::new(3);
        let mut data = act.create_data();
        let r = DVector::from_vec(vec![1.0, -2.0, 2.0]);
        act.calc(&mut data, &r).unwrap();
        assert_relative_eq!(data.value, 4.5);

        act.calc_diff(&mut data, &r).unwrap();
        assert_relative_eq!(data.gradient, r);
        assert_relative_eq!(data.hessian, DMatrix::identity(3, 3));
    }

    #[test]
    fn test_quadratic_derivatives() {
        let r = DVector::from_vec(vec![0.3, -1.2, 0.7]);
        check_derivatives(&Quadratic::new(3), &r, 1e-6);
    }

    #[test]
    fn test_weighted_quadratic() {
        let act = WeightedQuadratic::new(DVector::from_vec(vec![2.0, 0.0])).unwrap();
        let mut data = act.create_data();
        let r = DVector::from_vec(vec![3.0, 100.0]);
        act.calc(&mut data, &r).unwrap();
        assert_relative_eq!(data.value, 9.0);

        act.calc_diff(&mut data, &r).unwrap();
        assert_relative_eq!(data.gradient, DVector::from_vec(vec![6.0, 0.0]));
        assert_relative_eq!(data.hessian[(0, 0)], 2.0);
        assert_relative_eq!(data.hessian[(1, 1)], 0.0);

        check_derivatives(&act, &DVector::from_vec(vec![0.4, -0.9]), 1e-6);
    }

    #[test]
    fn test_weighted_quadratic_rejects_bad_weights() {
        assert!(WeightedQuadratic::new(DVector::from_vec(vec![1.0, -1.0])).is_err());
        assert!(WeightedQuadratic::new(DVector::from_vec(vec![f64::NAN])).is_err());
    }
}
