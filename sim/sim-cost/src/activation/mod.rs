//! Activation functions mapping a residual to a scalar cost.
//!
//! An activation `a(r)` turns a residual vector into a scalar and provides its
//! gradient `a_r` and Hessian `A_rr`. Cost models combine them with residual
//! Jacobians by the chain rule.
//!
//! # Available Activations
//!
//! - [`Quadratic`]: `½ rᵀr`
//! - [`WeightedQuadratic`]: `½ rᵀ diag(w) r`
//! - [`QuadraticBarrier`]: `½ ‖r − clamp(r, lb, ub)‖²`
//! - [`SmoothAbs`]: `Σ sqrt(ε + rᵢ²)`
//! - [`Footprint`]: smoothed penalty for leaving a rectangle in the first two
//!   residual components
//!
//! # Example
//!
//! ```
//! use sim_cost::{Activation, Quadratic};
//! use nalgebra::DVector;
//!
//! let act = Quadratic::new(2);
//! let mut data = act.create_data();
//! let r = DVector::from_vec(vec![3.0, 4.0]);
//!
//! act.calc(&mut data, &r).unwrap();
//! assert_eq!(data.value, 12.5);
//! ```

mod barrier;
mod footprint;
mod quadratic;
mod smooth_abs;

pub use barrier::QuadraticBarrier;
pub use footprint::Footprint;
pub use quadratic::{Quadratic, WeightedQuadratic};
pub use smooth_abs::SmoothAbs;

use nalgebra::{DMatrix, DVector};
use sim_types::{ensure_dimension, Result};

/// A scalar function of the residual with its first two derivatives.
///
/// Implementations are immutable and shareable; all per-evaluation values go
/// into [`ActivationData`].
pub trait Activation: std::fmt::Debug + Send + Sync {
    /// Residual dimension this activation accepts.
    fn nr(&self) -> usize;

    /// Evaluate `a(r)` into `data.value`.
    fn calc(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()>;

    /// Evaluate the gradient and Hessian of `a` at `r`.
    fn calc_diff(&self, data: &mut ActivationData, r: &DVector<f64>) -> Result<()>;

    /// Allocate scratch sized for this activation.
    fn create_data(&self) -> ActivationData {
        ActivationData::new(self.nr())
    }
}

/// Scratch written by an [`Activation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationData {
    /// Activation value.
    pub value: f64,
    /// Gradient with respect to the residual (`nr`).
    pub gradient: DVector<f64>,
    /// Hessian with respect to the residual (`nr × nr`).
    pub hessian: DMatrix<f64>,
}

impl ActivationData {
    /// Zeroed data for an `nr`-dimensional residual.
    #[must_use]
    pub fn new(nr: usize) -> Self {
        Self {
            value: 0.0,
            gradient: DVector::zeros(nr),
            hessian: DMatrix::zeros(nr, nr),
        }
    }
}

/// Check the residual and scratch dimensions before an evaluation.
fn check_inputs(nr: usize, data: &ActivationData, r: &DVector<f64>) -> Result<()> {
    ensure_dimension("activation residual", nr, r.len())?;
    ensure_dimension("activation gradient", nr, data.gradient.len())?;
    ensure_dimension("activation hessian", nr, data.hessian.nrows())
}
