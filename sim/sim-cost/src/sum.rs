//! Weighted sum of named cost terms.
//!
//! A [`CostSum`] evaluates every active term on the same `(x, u)` and
//! accumulates `weight · ℓ` together with the weighted derivative blocks.
//! Inactive terms keep their data but are skipped, and their data counts as
//! unevaluated until the next `calc` that includes them.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use sim_contact::DataCollector;
use sim_types::{ensure_dimension, Result, SimError, StateModel};
use tracing::{debug, trace};

use crate::cost::{CostData, CostModel};

/// One named term of a [`CostSum`].
#[derive(Debug, Clone)]
pub struct CostItem {
    /// Unique name within the sum.
    pub name: String,
    /// Cost model.
    pub cost: Arc<CostModel>,
    /// Scalar weight.
    pub weight: f64,
    /// Whether the term contributes.
    pub active: bool,
}

/// Collection of weighted cost terms sharing one state and control space.
#[derive(Debug, Clone)]
pub struct CostSum {
    state: Arc<dyn StateModel>,
    nu: usize,
    costs: Vec<CostItem>,
}

impl CostSum {
    /// Empty sum over `state` with control dimension `nu`.
    #[must_use]
    pub fn new(state: Arc<dyn StateModel>, nu: usize) -> Self {
        Self {
            state,
            nu,
            costs: Vec::new(),
        }
    }

    /// Add an active term.
    ///
    /// Fails on a duplicate name, a non-finite weight, or a term whose state
    /// or control dimensions differ from the sum's.
    pub fn add_cost(
        &mut self,
        name: impl Into<String>,
        cost: Arc<CostModel>,
        weight: f64,
    ) -> Result<()> {
        let name = name.into();
        if self.costs.iter().any(|item| item.name == name) {
            return Err(SimError::DuplicateCost { name });
        }
        if !weight.is_finite() {
            return Err(SimError::invalid_config(format!(
                "weight of cost term {name} must be finite, got {weight}"
            )));
        }
        ensure_dimension("cost term control", self.nu, cost.nu())?;
        ensure_dimension("cost term state", self.state.nx(), cost.state().nx())?;
        ensure_dimension("cost term state tangent", self.state.ndx(), cost.state().ndx())?;

        debug!(name = %name, weight, "added cost term");
        self.costs.push(CostItem {
            name,
            cost,
            weight,
            active: true,
        });
        Ok(())
    }

    /// Remove a term. Data created before the removal no longer matches.
    pub fn remove_cost(&mut self, name: &str) -> Result<CostItem> {
        let index = self.index_of(name)?;
        debug!(name, "removed cost term");
        Ok(self.costs.remove(index))
    }

    /// Enable or disable a term.
    pub fn set_active(&mut self, name: &str, active: bool) -> Result<()> {
        let index = self.index_of(name)?;
        self.costs[index].active = active;
        Ok(())
    }

    /// Whether a term is active.
    pub fn is_active(&self, name: &str) -> Result<bool> {
        Ok(self.costs[self.index_of(name)?].active)
    }

    /// Look up a term by name.
    pub fn get(&self, name: &str) -> Result<&CostItem> {
        Ok(&self.costs[self.index_of(name)?])
    }

    /// Term names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.costs.iter().map(|item| item.name.as_str()).collect()
    }

    /// Number of terms, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// Whether the sum has no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// State the sum is defined on.
    #[must_use]
    pub fn state(&self) -> &Arc<dyn StateModel> {
        &self.state
    }

    /// Control dimension.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.nu
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.costs
            .iter()
            .position(|item| item.name == name)
            .ok_or_else(|| SimError::CostNotFound {
                name: name.to_owned(),
            })
    }

    fn check_inputs(&self, data: &CostSumData, x: &DVector<f64>, u: &DVector<f64>) -> Result<()> {
        ensure_dimension("state", self.state.nx(), x.len())?;
        ensure_dimension("control", self.nu, u.len())?;
        ensure_dimension("cost terms", self.costs.len(), data.terms.len())
    }

    /// Evaluate the weighted total cost.
    pub fn calc(&self, data: &mut CostSumData, x: &DVector<f64>, u: &DVector<f64>) -> Result<()> {
        self.check_inputs(data, x, u)?;
        data.cost = 0.0;
        for (item, term) in self.costs.iter().zip(data.terms.iter_mut()) {
            if !item.active {
                term.residual.invalidate();
                continue;
            }
            item.cost.calc(term, x, u)?;
            data.cost += item.weight * term.cost;
        }
        trace!(cost = data.cost, "cost sum calc");
        Ok(())
    }

    /// Evaluate the weighted derivative blocks. Requires a prior
    /// [`CostSum::calc`] at the same point.
    pub fn calc_diff(
        &self,
        data: &mut CostSumData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<()> {
        self.check_inputs(data, x, u)?;
        data.lx.fill(0.0);
        data.lu.fill(0.0);
        data.lxx.fill(0.0);
        data.lxu.fill(0.0);
        data.luu.fill(0.0);
        for (item, term) in self.costs.iter().zip(data.terms.iter_mut()) {
            if !item.active {
                continue;
            }
            item.cost.calc_diff(term, x, u)?;
            let w = item.weight;
            data.lx.axpy(w, &term.lx, 1.0);
            data.lu.axpy(w, &term.lu, 1.0);
            data.lxx += &term.lxx * w;
            data.lxu += &term.lxu * w;
            data.luu += &term.luu * w;
        }
        Ok(())
    }

    /// Evaluate at a terminal node (zero control).
    pub fn calc_terminal(&self, data: &mut CostSumData, x: &DVector<f64>) -> Result<()> {
        self.calc(data, x, &DVector::zeros(self.nu))
    }

    /// Terminal counterpart of [`CostSum::calc_diff`].
    pub fn calc_diff_terminal(&self, data: &mut CostSumData, x: &DVector<f64>) -> Result<()> {
        self.calc_diff(data, x, &DVector::zeros(self.nu))
    }

    /// Allocate data for every term, active or not.
    pub fn create_data(&self, collector: &DataCollector) -> Result<CostSumData> {
        let ndx = self.state.ndx();
        let terms = self
            .costs
            .iter()
            .map(|item| item.cost.create_data(collector))
            .collect::<Result<Vec<_>>>()?;
        Ok(CostSumData {
            cost: 0.0,
            lx: DVector::zeros(ndx),
            lu: DVector::zeros(self.nu),
            lxx: DMatrix::zeros(ndx, ndx),
            lxu: DMatrix::zeros(ndx, self.nu),
            luu: DMatrix::zeros(self.nu, self.nu),
            terms,
        })
    }
}

/// Per-node scratch for a [`CostSum`].
#[derive(Debug, Clone)]
pub struct CostSumData {
    /// Weighted total cost.
    pub cost: f64,
    /// Weighted state gradient.
    pub lx: DVector<f64>,
    /// Weighted control gradient.
    pub lu: DVector<f64>,
    /// Weighted state Hessian.
    pub lxx: DMatrix<f64>,
    /// Weighted mixed Hessian.
    pub lxu: DMatrix<f64>,
    /// Weighted control Hessian.
    pub luu: DMatrix<f64>,
    /// Per-term data, in the order the terms were added.
    pub terms: Vec<CostData>,
}
