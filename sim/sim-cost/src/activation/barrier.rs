//! Quadratic barrier activation.

use nalgebra::DVector;
use sim_types::{ensure_dimension, Result, SimError};

use super::{check_inputs, Activation, ActivationData};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Penalises only the part of the residual outside `[lower, upper]`:
/// `a(r) = ½ ‖r − clamp(r, lower, upper)‖²`.
///
/// Infinite bounds are allowed and leave that side unpenalised.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuadraticBarrier {
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl QuadraticBarrier {
    /// Create a barrier with per-component bounds.
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Result<Self> {
        ensure_dimension("barrier upper bound", lower.len(), upper.len())?;
        for (i, (lb, ub)) in lower.iter().zip(upper.iter()).enumerate() {
            if lb.is_nan() || ub.is_nan() || lb > ub {
                return Err(SimError::invalid_config(format!(
                    "barrier bounds at {i} are invalid: [{lb}, {ub}]"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Lower bounds.
    #[must_use]
    pub fn lower(&self) -> &DVector<f64> {
        &self.lower
    }

    /// Upper bounds.
    #[must_use]
    pub fn upper(&self) -> &DVector<f64> {
        &self.upper
    }

    fn violation(&self, r: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            r.len(),
            r.iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .map(|(ri, (lb, ub))| ri - ri.clamp(*lb, *ub)),
        )
    }
}

impl Activation for QuadraticBarrier {
    fn nr(&self) -> usize {
        self.lower.len()
    }

    fn calc(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr(), data, r)?;
        data.value = 0.5 * self.violation(r).norm_squared();
        Ok(())
    }

    fn calc_diff(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()> {
        check_inputs(self.nr(), data, r)?;
        let violation = self.violation(r);
        data.gradient.copy_from(&violation);
        data.hessian.fill(0.0);
        for (i, v) in violation.iter().enumerate() {
            if *v != 0.0 {
                data.hessian[(i, i)] = 1.0;
            }
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

    fn barrier() -> QuadraticBarrier {
        QuadraticBarrier::new(
            DVector::from_vec(vec![-1.0, f64::NEG_INFINITY]),
            DVector::from_vec(vec![1.0, 0.5]),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_inside_bounds() {
        let act = barrier();
        let mut data = act.create_data();
        let r = DVector::from_vec(vec![0.5, -100.0]);
        act.calc(&mut data, &r).unwrap();
        assert_relative_eq!(data.value, 0.0);

        act.calc_diff(&mut data, &r).unwrap();
        assert_relative_eq!(data.gradient.norm(), 0.0);
        assert_relative_eq!(data.hessian.norm(), 0.0);
    }

    #[test]
    fn test_penalises_violation() {
        let act = barrier();
        let mut data = act.create_data();
        let r = DVector::from_vec(vec![-3.0, 1.5]);
        act.calc(&mut data, &r).unwrap();
        assert_relative_eq!(data.value, 0.5 * (4.0 + 1.0));

        act.calc_diff(&mut data, &r).unwrap();
        assert_relative_eq!(data.gradient, DVector::from_vec(vec![-2.0, 1.0]));
        assert_relative_eq!(data.hessian[(0, 0)], 1.0);
        assert_relative_eq!(data.hessian[(1, 1)], 1.0);
    }

    #[test]
    fn test_barrier_derivatives_away_from_kinks() {
        check_derivatives(&barrier(), &DVector::from_vec(vec![1.7, -0.3]), 1e-6);
        check_derivatives(&barrier(), &DVector::from_vec(vec![-2.1, 0.9]), 1e-6);
    }

    #[test]
    fn test_rejects_crossed_bounds() {
        let err = QuadraticBarrier::new(DVector::from_vec(vec![1.0]), DVector::from_vec(vec![0.0]))
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(QuadraticBarrier::new(DVector::zeros(2), DVector::zeros(3)).is_err());
    }
}
