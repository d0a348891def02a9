//! Residuals, activations and cost models for trajectory optimisation.
//!
//! A cost term is a residual `r(x, u)` passed through an activation `a(r)`.
//! Both provide analytical derivatives; the [`CostModel`] chains them into the
//! gradient and Gauss-Newton Hessian blocks a DDP-style solver consumes:
//!
//! ```text
//! ℓ   = a(r(x, u))
//! ℓx  = Rxᵀ a_r                 ℓu  = Ruᵀ a_r
//! ℓxx = Rxᵀ A_rr Rx             ℓxu = Rxᵀ A_rr Ru           ℓuu = Ruᵀ A_rr Ru
//! ```
//!
//! # Residuals
//!
//! - [`ResidualAnticipatedState`] - Neutral-configuration error of `q ⊕ t_a·v`
//! - [`ResidualContactCop`] - Foot position minus contact centre of pressure, in
//!   world or sole axes
//!
//! # Data Lifecycle
//!
//! Models are immutable and shared behind `Arc`. Every trajectory node owns
//! its own data, created by the model from that node's
//! [`DataCollector`](sim_contact::DataCollector). `calc` must run before
//! `calc_diff` on the same data.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use nalgebra::DVector;
//! use sim_contact::DataCollector;
//! use sim_cost::{CostModel, ResidualAnticipatedState};
//! use sim_types::StateVector;
//!
//! let residual = ResidualAnticipatedState::with_default_nu(Arc::new(StateVector::new(2)), 0.5)?;
//! let cost = CostModel::quadratic(Arc::new(residual))?;
//! let mut data = cost.create_data(&DataCollector::new())?;
//!
//! let x = DVector::from_vec(vec![1.0, 0.0, 0.0, 2.0]);
//! let u = DVector::zeros(2);
//! cost.calc(&mut data, &x, &u)?;
//! cost.calc_diff(&mut data, &x, &u)?;
//!
//! // r = [1, 1], cost = ½ ‖r‖²
//! assert!((data.cost - 1.0).abs() < 1e-12);
//! assert_eq!(data.lx.len(), 4);
//! # Ok::<(), sim_types::SimError>(())
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. Evaluation is
//! synchronous and allocation happens in `create_data`, so node data can be
//! evaluated from worker threads as long as each thread owns its data.

#![doc(html_root_url = "https://docs.rs/sim-cost/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::suboptimal_flops,
    clippy::many_single_char_names
)]

pub mod activation;
mod cost;
mod finite_diff;
mod pool;
pub mod residual;
mod sum;

pub use activation::{
    Activation, ActivationData, Footprint, Quadratic, QuadraticBarrier, SmoothAbs,
    WeightedQuadratic,
};
pub use cost::{CostData, CostModel};
pub use finite_diff::{cost_gradient_fd, max_relative_error, residual_jacobians_fd};
pub use pool::CostDataPool;
pub use residual::{
    AnticipatedStateScratch, ContactCopScratch, Residual, ResidualAnticipatedState,
    ResidualContactCop, ResidualData, ResidualScratch,
};
pub use sum::{CostItem, CostSum, CostSumData};

// Re-export types callers need alongside the models
pub use sim_types::{CopConfig, CopFrame, DegenerateCopPolicy, FiniteDiffConfig, Result, SimError};
