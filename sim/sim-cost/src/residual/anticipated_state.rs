//! Anticipated-state residual.
//!
//! Predicts where the configuration will be after `t_a` seconds at the
//! current velocity and measures it from the neutral configuration:
//!
//! ```text
//! r = q₀ ⊖ (q ⊕ t_a·v)            (nr = nv)
//! Rx = [Jd·Jq | t_a·Jd·Jv]
//! Ru = 0
//! ```
//!
//! where `Jq`, `Jv` are the Jacobians of `⊕` with respect to `q` and its
//! increment, and `Jd` is the Jacobian of `⊖` with respect to its second
//! argument. On Euclidean states this is `r = q + t_a·v`, `Rx = [I | t_a·I]`.

use std::sync::Arc;

use nalgebra::DVector;
use sim_contact::DataCollector;
use sim_types::{Result, SimError, StateModel};
use tracing::{debug, trace};

use super::{AnticipatedStateScratch, Residual, ResidualData, ResidualScratch};

/// Residual on the configuration anticipated from the current velocity.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use nalgebra::DVector;
/// use sim_contact::DataCollector;
/// use sim_cost::{Residual, ResidualAnticipatedState};
/// use sim_types::StateVector;
///
/// let residual =
///     ResidualAnticipatedState::with_default_nu(Arc::new(StateVector::new(2)), 2.0).unwrap();
/// let mut data = residual.create_data(&DataCollector::new()).unwrap();
///
/// let x = DVector::from_vec(vec![1.0, 2.0, 0.5, -1.0]);
/// let u = DVector::zeros(2);
/// residual.calc(&mut data, &x, &u).unwrap();
/// assert_eq!(data.r, DVector::from_vec(vec![2.0, 0.0]));
/// ```
#[derive(Debug, Clone)]
pub struct ResidualAnticipatedState {
    state: Arc<dyn StateModel>,
    nu: usize,
    anticipation_time: f64,
    neutral: DVector<f64>,
}

impl ResidualAnticipatedState {
    /// Create the residual with an explicit control dimension.
    pub fn new(state: Arc<dyn StateModel>, nu: usize, anticipation_time: f64) -> Result<Self> {
        if !anticipation_time.is_finite() {
            return Err(SimError::invalid_config(format!(
                "anticipation time must be finite, got {anticipation_time}"
            )));
        }
        let neutral = state.neutral_configuration();
        debug!(
            nq = state.nq(),
            nv = state.nv(),
            nu,
            anticipation_time,
            "created anticipated-state residual"
        );
        Ok(Self {
            state,
            nu,
            anticipation_time,
            neutral,
        })
    }

    /// Create the residual with `nu = nv`.
    pub fn with_default_nu(state: Arc<dyn StateModel>, anticipation_time: f64) -> Result<Self> {
        let nu = state.nv();
        Self::new(state, nu, anticipation_time)
    }

    /// Look-ahead time `t_a` (s).
    #[must_use]
    pub fn anticipation_time(&self) -> f64 {
        self.anticipation_time
    }

    fn scratch_mut<'a>(
        &self,
        data: &'a mut ResidualData,
    ) -> Result<&'a mut AnticipatedStateScratch> {
        match &mut data.scratch {
            ResidualScratch::AnticipatedState(scratch) => Ok(scratch),
            _ => Err(SimError::invalid_config(
                "residual data was not created by an anticipated-state residual",
            )),
        }
    }
}

impl Residual for ResidualAnticipatedState {
    fn state(&self) -> &Arc<dyn StateModel> {
        &self.state
    }

    fn nu(&self) -> usize {
        self.nu
    }

    fn nr(&self) -> usize {
        self.state.nv()
    }

    fn calc(&self, data: &mut ResidualData, x: &DVector<f64>, u: &DVector<f64>) -> Result<()> {
        self.check_inputs(x, u)?;
        data.check_shape(self.nr(), self.state.ndx(), self.nu)?;
        data.invalidate();

        let q = self.state.configuration(x)?;
        let v = self.state.velocity(x)?;
        let anticipated = self
            .state
            .integrate_configuration(&q, &(v * self.anticipation_time))?;
        let r = self
            .state
            .difference_configuration(&self.neutral, &anticipated)?;

        self.scratch_mut(data)?.anticipated = anticipated;
        data.r.copy_from(&r);
        data.mark_evaluated();
        trace!(norm = r.norm(), "anticipated-state residual");
        Ok(())
    }

    fn calc_diff(
        &self,
        data: &mut ResidualData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<()> {
        self.check_inputs(x, u)?;
        data.ensure_evaluated()?;
        let nv = self.state.nv();
        let t_a = self.anticipation_time;

        let q = self.state.configuration(x)?;
        let v = self.state.velocity(x)?;
        let (jq, jv) = self
            .state
            .jacobian_integrate_configuration(&q, &(v * t_a))?;
        let anticipated = self.scratch_mut(data)?.anticipated.clone();
        let (_, jd) = self
            .state
            .jacobian_difference_configuration(&self.neutral, &anticipated)?;

        data.rx.view_mut((0, 0), (nv, nv)).copy_from(&(&jd * jq));
        data.rx
            .view_mut((0, nv), (nv, nv))
            .copy_from(&((&jd * jv) * t_a));
        data.ru.fill(0.0);
        Ok(())
    }

    fn create_data(&self, _collector: &DataCollector) -> Result<ResidualData> {
        Ok(
            ResidualData::new(self.nr(), self.state.ndx(), self.nu).with_scratch(
                ResidualScratch::AnticipatedState(AnticipatedStateScratch {
                    anticipated: self.neutral.clone(),
                }),
            ),
        )
    }
}
