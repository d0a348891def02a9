//! Cost model: a residual composed with an activation.
//!
//! ```text
//! ℓ(x, u)  = a(r(x, u))
//! ℓx       = Rxᵀ a_r           ℓu  = Ruᵀ a_r
//! ℓxx      = Rxᵀ A_rr Rx       ℓxu = Rxᵀ A_rr Ru       ℓuu = Ruᵀ A_rr Ru
//! ```
//!
//! The second-order blocks are the Gauss-Newton approximation: the residual's
//! own second derivatives are dropped.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use sim_contact::{DataCollector, FootGeometry};
use sim_types::{CopConfig, CopFrame, Result, SimError, StateModel};
use tracing::{debug, trace};

use crate::activation::{Activation, ActivationData, Footprint, Quadratic};
use crate::residual::{Residual, ResidualContactCop, ResidualData};

/// A scalar cost term `a(r(x, u))`.
#[derive(Debug, Clone)]
pub struct CostModel {
    residual: Arc<dyn Residual>,
    activation: Arc<dyn Activation>,
}

impl CostModel {
    /// Compose a residual with an activation of the same dimension.
    pub fn new(residual: Arc<dyn Residual>, activation: Arc<dyn Activation>) -> Result<Self> {
        if activation.nr() != residual.nr() {
            return Err(SimError::dimension(
                "activation residual",
                residual.nr(),
                activation.nr(),
            ));
        }
        debug!(
            nr = residual.nr(),
            nu = residual.nu(),
            ndx = residual.state().ndx(),
            "created cost model"
        );
        Ok(Self {
            residual,
            activation,
        })
    }

    /// `½ ‖r‖²` on the given residual.
    pub fn quadratic(residual: Arc<dyn Residual>) -> Result<Self> {
        let activation = Arc::new(Quadratic::new(residual.nr()));
        Self::new(residual, activation)
    }

    /// Centre-of-pressure cost: the contact CoP residual of `foot`, expressed
    /// in the sole frame, penalised by its [`Footprint`] with hinge smoothing
    /// `smoothing`. The cost is zero while the CoP stays on the sole.
    pub fn contact_cop_position(
        state: Arc<dyn StateModel>,
        nu: usize,
        foot: FootGeometry,
        config: CopConfig,
        smoothing: f64,
    ) -> Result<Self> {
        let activation = Arc::new(Footprint::from_foot(&foot, smoothing)?);
        let residual =
            Arc::new(ResidualContactCop::new(state, nu, foot, config)?.with_frame(CopFrame::Sole));
        Self::new(residual, activation)
    }

    /// Residual model.
    #[must_use]
    pub fn residual(&self) -> &Arc<dyn Residual> {
        &self.residual
    }

    /// Activation model.
    #[must_use]
    pub fn activation(&self) -> &Arc<dyn Activation> {
        &self.activation
    }

    /// State the cost is defined on.
    #[must_use]
    pub fn state(&self) -> &Arc<dyn StateModel> {
        self.residual.state()
    }

    /// Control dimension.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.residual.nu()
    }

    /// Residual dimension.
    #[must_use]
    pub fn nr(&self) -> usize {
        self.residual.nr()
    }

    /// Evaluate the cost.
    pub fn calc(&self, data: &mut CostData, x: &DVector<f64>, u: &DVector<f64>) -> Result<()> {
        self.residual.calc(&mut data.residual, x, u)?;
        self.activation.calc(&mut data.activation, &data.residual.r)?;
        data.cost = data.activation.value;
        trace!(cost = data.cost, "cost calc");
        Ok(())
    }

    /// Evaluate the cost derivatives. Requires a prior [`CostModel::calc`] at
    /// the same point.
    pub fn calc_diff(
        &self,
        data: &mut CostData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<()> {
        self.residual.calc_diff(&mut data.residual, x, u)?;
        self.activation
            .calc_diff(&mut data.activation, &data.residual.r)?;

        let CostData {
            lx,
            lu,
            lxx,
            lxu,
            luu,
            residual,
            activation,
            ..
        } = data;
        let (rx, ru) = (&residual.rx, &residual.ru);

        rx.tr_mul_to(&activation.gradient, lx);
        ru.tr_mul_to(&activation.gradient, lu);

        let arr_rx = &activation.hessian * rx;
        let arr_ru = &activation.hessian * ru;
        rx.tr_mul_to(&arr_rx, lxx);
        rx.tr_mul_to(&arr_ru, lxu);
        ru.tr_mul_to(&arr_ru, luu);

        trace!(lx_norm = lx.norm(), lu_norm = lu.norm(), "cost calc_diff");
        Ok(())
    }

    /// Evaluate the cost at a terminal node (zero control).
    pub fn calc_terminal(&self, data: &mut CostData, x: &DVector<f64>) -> Result<()> {
        self.calc(data, x, &DVector::zeros(self.nu()))
    }

    /// Terminal counterpart of [`CostModel::calc_diff`].
    pub fn calc_diff_terminal(&self, data: &mut CostData, x: &DVector<f64>) -> Result<()> {
        self.calc_diff(data, x, &DVector::zeros(self.nu()))
    }

    /// Allocate data for one node, binding it to that node's collector.
    pub fn create_data(&self, collector: &DataCollector) -> Result<CostData> {
        let ndx = self.state().ndx();
        let nu = self.nu();
        Ok(CostData {
            cost: 0.0,
            lx: DVector::zeros(ndx),
            lu: DVector::zeros(nu),
            lxx: DMatrix::zeros(ndx, ndx),
            lxu: DMatrix::zeros(ndx, nu),
            luu: DMatrix::zeros(nu, nu),
            residual: self.residual.create_data(collector)?,
            activation: self.activation.create_data(),
        })
    }
}

/// Per-node scratch for a [`CostModel`].
#[derive(Debug, Clone)]
pub struct CostData {
    /// Cost value.
    pub cost: f64,
    /// Gradient with respect to the state tangent (`ndx`).
    pub lx: DVector<f64>,
    /// Gradient with respect to the control (`nu`).
    pub lu: DVector<f64>,
    /// State Hessian (`ndx × ndx`).
    pub lxx: DMatrix<f64>,
    /// Mixed Hessian (`ndx × nu`).
    pub lxu: DMatrix<f64>,
    /// Control Hessian (`nu × nu`).
    pub luu: DMatrix<f64>,
    /// Residual scratch.
    pub residual: ResidualData,
    /// Activation scratch.
    pub activation: ActivationData,
}
