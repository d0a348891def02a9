//! Cost data for every node of a trajectory, allocated once.
//!
//! Nodes are evaluated in parallel via rayon when the `parallel` feature is
//! enabled and sequentially otherwise. Each node owns its data, so results do
//! not depend on scheduling.

use nalgebra::DVector;
use sim_contact::DataCollector;
use sim_types::{ensure_dimension, Result};
use tracing::debug;

use crate::cost::{CostData, CostModel};

/// One [`CostData`] per trajectory node, each bound to that node's collector.
#[derive(Debug, Clone)]
pub struct CostDataPool {
    nodes: Vec<CostData>,
}

impl CostDataPool {
    /// Allocate data for each collector in order.
    pub fn new(cost: &CostModel, collectors: &[DataCollector]) -> Result<Self> {
        let nodes = collectors
            .iter()
            .map(|collector| cost.create_data(collector))
            .collect::<Result<Vec<_>>>()?;
        debug!(nodes = nodes.len(), "allocated cost data pool");
        Ok(Self { nodes })
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Data of node `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CostData> {
        self.nodes.get(index)
    }

    /// Mutable data of node `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut CostData> {
        self.nodes.get_mut(index)
    }

    /// Iterate over node data in order.
    pub fn iter(&self) -> impl Iterator<Item = &CostData> {
        self.nodes.iter()
    }

    /// Evaluate `cost` at every node; `xs[k]`, `us[k]` belong to node `k`.
    ///
    /// Returns an error from a failing node. Which other nodes were evaluated
    /// by then is unspecified in parallel mode.
    pub fn calc_all(
        &mut self,
        cost: &CostModel,
        xs: &[DVector<f64>],
        us: &[DVector<f64>],
    ) -> Result<()> {
        self.check_lengths(xs, us)?;

        #[cfg(feature = "parallel")]
        {
            use rayon::iter::{
                IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator,
                ParallelIterator,
            };
            self.nodes
                .par_iter_mut()
                .zip(xs.par_iter())
                .zip(us.par_iter())
                .try_for_each(|((data, x), u)| cost.calc(data, x, u))
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.nodes
                .iter_mut()
                .zip(xs)
                .zip(us)
                .try_for_each(|((data, x), u)| cost.calc(data, x, u))
        }
    }

    /// Evaluate the derivatives of `cost` at every node.
    pub fn calc_diff_all(
        &mut self,
        cost: &CostModel,
        xs: &[DVector<f64>],
        us: &[DVector<f64>],
    ) -> Result<()> {
        self.check_lengths(xs, us)?;

        #[cfg(feature = "parallel")]
        {
            use rayon::iter::{
                IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator,
                ParallelIterator,
            };
            self.nodes
                .par_iter_mut()
                .zip(xs.par_iter())
                .zip(us.par_iter())
                .try_for_each(|((data, x), u)| cost.calc_diff(data, x, u))
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.nodes
                .iter_mut()
                .zip(xs)
                .zip(us)
                .try_for_each(|((data, x), u)| cost.calc_diff(data, x, u))
        }
    }

    /// Sum of the node costs from the last evaluation.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.nodes.iter().map(|data| data.cost).sum()
    }

    fn check_lengths(&self, xs: &[DVector<f64>], us: &[DVector<f64>]) -> Result<()> {
        ensure_dimension("trajectory states", self.nodes.len(), xs.len())?;
        ensure_dimension("trajectory controls", self.nodes.len(), us.len())
    }
}
