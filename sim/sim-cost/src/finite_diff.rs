//! Finite-difference checks for analytical derivatives.
//!
//! State columns are perturbed along the tangent space with
//! [`StateModel::integrate`], so the numerical Jacobians are directly
//! comparable with `Rx` and `ℓx` on any state manifold. Control columns are
//! perturbed coordinate-wise.
//!
//! Residuals that read external inputs (such as contact data in a
//! [`DataCollector`](sim_contact::DataCollector)) only see a perturbation if
//! those inputs are recomputed first. Every evaluation therefore calls a
//! `refresh(x, u)` hook before `calc`; pass `|_, _| Ok(())` when the residual
//! depends on `(x, u)` alone. After differencing, the hook and `calc` run once
//! more at the nominal point so the data is left as the caller passed it.

use nalgebra::{DMatrix, DVector};
use sim_types::{ensure_dimension, FiniteDiffConfig, Result, StateModel};
use tracing::trace;

use crate::cost::{CostData, CostModel};
use crate::residual::{Residual, ResidualData};

/// Numerical `(Rx, Ru)` of a residual at `(x, u)`.
pub fn residual_jacobians_fd<F>(
    residual: &dyn Residual,
    data: &mut ResidualData,
    x: &DVector<f64>,
    u: &DVector<f64>,
    config: &FiniteDiffConfig,
    mut refresh: F,
) -> Result<(DMatrix<f64>, DMatrix<f64>)>
where
    F: FnMut(&DVector<f64>, &DVector<f64>) -> Result<()>,
{
    residual.check_inputs(x, u)?;
    let jacobians = jacobians_fd(residual.state().as_ref(), x, u, config, |x, u| {
        refresh(x, u)?;
        residual.calc(data, x, u)?;
        Ok(data.r.clone())
    });

    refresh(x, u)?;
    residual.calc(data, x, u)?;
    jacobians
}

/// Numerical `(ℓx, ℓu)` of a cost at `(x, u)`.
pub fn cost_gradient_fd<F>(
    cost: &CostModel,
    data: &mut CostData,
    x: &DVector<f64>,
    u: &DVector<f64>,
    config: &FiniteDiffConfig,
    mut refresh: F,
) -> Result<(DVector<f64>, DVector<f64>)>
where
    F: FnMut(&DVector<f64>, &DVector<f64>) -> Result<()>,
{
    cost.residual().check_inputs(x, u)?;
    let jacobians = jacobians_fd(cost.state().as_ref(), x, u, config, |x, u| {
        refresh(x, u)?;
        cost.calc(data, x, u)?;
        Ok(DVector::from_element(1, data.cost))
    });

    refresh(x, u)?;
    cost.calc(data, x, u)?;
    let (lx, lu) = jacobians?;
    Ok((lx.row(0).transpose(), lu.row(0).transpose()))
}

/// Difference `eval` over the state tangent and the control.
fn jacobians_fd<E>(
    state: &dyn StateModel,
    x: &DVector<f64>,
    u: &DVector<f64>,
    config: &FiniteDiffConfig,
    mut eval: E,
) -> Result<(DMatrix<f64>, DMatrix<f64>)>
where
    E: FnMut(&DVector<f64>, &DVector<f64>) -> Result<DVector<f64>>,
{
    config.validate()?;
    let eps = config.eps;
    let ndx = state.ndx();
    let nu = u.len();

    let nominal = eval(x, u)?;
    let nr = nominal.len();
    let mut jx = DMatrix::zeros(nr, ndx);
    let mut ju = DMatrix::zeros(nr, nu);

    // ==================== State tangent columns ====================
    let mut dx = DVector::zeros(ndx);
    for i in 0..ndx {
        dx[i] = eps;
        let plus = eval(&state.integrate(x, &dx)?, u)?;
        let column = if config.centered {
            let minus = eval(&state.integrate(x, &(-&dx))?, u)?;
            (plus - minus) / (2.0 * eps)
        } else {
            (plus - &nominal) / eps
        };
        jx.set_column(i, &column);
        dx[i] = 0.0;
    }

    // ==================== Control columns ====================
    let mut perturbed = u.clone();
    for j in 0..nu {
        perturbed[j] = u[j] + eps;
        let plus = eval(x, &perturbed)?;
        let column = if config.centered {
            perturbed[j] = u[j] - eps;
            let minus = eval(x, &perturbed)?;
            (plus - minus) / (2.0 * eps)
        } else {
            (plus - &nominal) / eps
        };
        ju.set_column(j, &column);
        perturbed[j] = u[j];
    }

    trace!(nr, ndx, nu, eps, centered = config.centered, "finite differences");
    Ok((jx, ju))
}

/// Largest element-wise relative error between two matrices.
///
/// Each element is compared as `|a - b| / max(|a|, |b|, floor)`; `floor`
/// keeps entries that are both near zero from dominating. Returns the error
/// and its `(row, col)`.
pub fn max_relative_error(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    floor: f64,
) -> Result<(f64, (usize, usize))> {
    ensure_dimension("compared rows", a.nrows(), b.nrows())?;
    ensure_dimension("compared columns", a.ncols(), b.ncols())?;
    let mut max_err = 0.0_f64;
    let mut max_loc = (0, 0);
    for r in 0..a.nrows() {
        for c in 0..a.ncols() {
            let va = a[(r, c)];
            let vb = b[(r, c)];
            let denom = va.abs().max(vb.abs()).max(floor);
            let err = (va - vb).abs() / denom;
            if err > max_err {
                max_err = err;
                max_loc = (r, c);
            }
        }
    }
    Ok((max_err, max_loc))
}
