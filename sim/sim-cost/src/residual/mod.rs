//! Residual models.
//!
//! A residual model maps a state `x` and control `u` to a vector `r(x, u)` and
//! provides its Jacobians `Rx = ∂r/∂x` (`nr × ndx`, with respect to the state
//! tangent) and `Ru = ∂r/∂u` (`nr × nu`).
//!
//! Models are immutable and shared behind `Arc`; every evaluation writes into
//! a [`ResidualData`] created by the model for one trajectory node.
//! `calc_diff` reads intermediates left by `calc` and refuses to run on data
//! that was never evaluated.

mod anticipated_state;
mod contact_cop;

pub use anticipated_state::ResidualAnticipatedState;
pub use contact_cop::ResidualContactCop;

use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use sim_contact::{DataCollector, SharedContact};
use sim_types::{ensure_dimension, Result, SimError, SpatialForce, StateModel};

/// A residual function of state and control with analytical Jacobians.
pub trait Residual: std::fmt::Debug + Send + Sync {
    /// State the residual is defined on.
    fn state(&self) -> &Arc<dyn StateModel>;

    /// Control dimension.
    fn nu(&self) -> usize;

    /// Residual dimension.
    fn nr(&self) -> usize;

    /// Evaluate `r(x, u)` into `data.r`.
    fn calc(&self, data: &mut ResidualData, x: &DVector<f64>, u: &DVector<f64>) -> Result<()>;

    /// Evaluate `Rx` and `Ru` into `data`. Requires a prior [`Residual::calc`]
    /// on the same data.
    fn calc_diff(&self, data: &mut ResidualData, x: &DVector<f64>, u: &DVector<f64>)
        -> Result<()>;

    /// Allocate data for one node, binding it to that node's collector.
    fn create_data(&self, collector: &DataCollector) -> Result<ResidualData>;

    /// Check `x` and `u` against the model dimensions.
    fn check_inputs(&self, x: &DVector<f64>, u: &DVector<f64>) -> Result<()> {
        ensure_dimension("state", self.state().nx(), x.len())?;
        ensure_dimension("control", self.nu(), u.len())
    }
}

/// Per-node scratch written by a [`Residual`].
#[derive(Debug, Clone)]
pub struct ResidualData {
    /// Residual vector (`nr`).
    pub r: DVector<f64>,
    /// Jacobian with respect to the state tangent (`nr × ndx`).
    pub rx: DMatrix<f64>,
    /// Jacobian with respect to the control (`nr × nu`).
    pub ru: DMatrix<f64>,
    /// Intermediates specific to the residual variant.
    pub scratch: ResidualScratch,
    evaluated: bool,
}

impl ResidualData {
    /// Zeroed data with no variant scratch.
    #[must_use]
    pub fn new(nr: usize, ndx: usize, nu: usize) -> Self {
        Self {
            r: DVector::zeros(nr),
            rx: DMatrix::zeros(nr, ndx),
            ru: DMatrix::zeros(nr, nu),
            scratch: ResidualScratch::None,
            evaluated: false,
        }
    }

    /// Attach variant scratch.
    #[must_use]
    pub fn with_scratch(mut self, scratch: ResidualScratch) -> Self {
        self.scratch = scratch;
        self
    }

    /// Whether `calc` has run on this data.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// Record a successful `calc`.
    pub fn mark_evaluated(&mut self) {
        self.evaluated = true;
    }

    /// Forget any previous evaluation.
    pub fn invalidate(&mut self) {
        self.evaluated = false;
    }

    /// Fail with [`SimError::NotEvaluated`] unless `calc` has run.
    pub fn ensure_evaluated(&self) -> Result<()> {
        if self.evaluated {
            Ok(())
        } else {
            Err(SimError::NotEvaluated {
                what: "residual data",
            })
        }
    }

    /// Check that the buffers match a model's dimensions.
    pub fn check_shape(&self, nr: usize, ndx: usize, nu: usize) -> Result<()> {
        ensure_dimension("residual", nr, self.r.len())?;
        ensure_dimension("residual state jacobian columns", ndx, self.rx.ncols())?;
        ensure_dimension("residual control jacobian columns", nu, self.ru.ncols())
    }
}

/// Variant-specific intermediates carried by [`ResidualData`].
#[derive(Debug, Clone)]
pub enum ResidualScratch {
    /// No intermediates.
    None,
    /// Anticipated-state intermediates.
    AnticipatedState(AnticipatedStateScratch),
    /// Contact centre-of-pressure intermediates.
    ContactCop(ContactCopScratch),
}

/// Intermediates of [`ResidualAnticipatedState`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnticipatedStateScratch {
    /// Anticipated configuration `q ⊕ t_a·v`.
    pub anticipated: DVector<f64>,
}

/// Intermediates of [`ResidualContactCop`].
#[derive(Debug, Clone)]
pub struct ContactCopScratch {
    /// Handle to the node's contact data.
    pub contact: SharedContact,
    /// Contact force about the contact frame origin, world-aligned axes.
    pub world_force: SpatialForce,
    /// World position of the contact frame.
    pub foot_position: Vector3<f64>,
    /// World rotation of the contact frame.
    pub frame_rotation: Matrix3<f64>,
    /// Centre of pressure relative to the contact frame origin, world-aligned
    /// axes.
    pub cop: Vector3<f64>,
    /// Jacobian of the CoP with respect to the state tangent (`3 × ndx`).
    pub dcop_dx: DMatrix<f64>,
    /// Jacobian of the CoP with respect to the control (`3 × nu`).
    pub dcop_du: DMatrix<f64>,
    /// Whether the last evaluation fell back to the frame origin.
    pub degenerate: bool,
}
