//! Core types for residual and cost models.
//!
//! This crate provides the foundational types shared by contact and cost
//! crates:
//!
//! - [`Placement`] - Rigid placement of a frame (rotation + translation)
//! - [`SpatialForce`] - 6D force/torque pair with its transformation law
//! - [`JointKind`] - Joint manifolds (revolute, spherical, free flyer, ...)
//! - [`StateModel`] - Dimensions and manifold operations of a robot state
//! - [`CopConfig`], [`FiniteDiffConfig`] - Numerical settings
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//!
//! - Trajectory optimisation back ends
//! - Hardware control code
//! - Analysis tools
//!
//! # Coordinate System
//!
//! Consistent with the CortenForge ecosystem:
//!
//! - X: forward (foot length)
//! - Y: left (foot width)
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use sim_types::{Placement, SpatialForce};
//! use nalgebra::Vector3;
//!
//! // A foot 10 cm in front of its ankle, loaded with 10 N straight up.
//! let ankle_to_sole = Placement::from_translation(Vector3::new(0.1, 0.0, 0.0));
//! let load = SpatialForce::new(Vector3::new(0.0, 0.0, 10.0), Vector3::zeros());
//!
//! let at_ankle = ankle_to_sole.act_force(&load);
//! assert_eq!(at_ankle.linear.z, 10.0);
//! assert!((at_ankle.angular.y + 1.0).abs() < 1e-12);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod config;
mod error;
mod joint;
pub mod lie;
mod placement;
pub mod spatial;
mod state;

pub use config::{CopConfig, CopFrame, DegenerateCopPolicy, FiniteDiffConfig};
pub use error::{ensure_dimension, SimError};
pub use joint::{JointId, JointKind};
pub use placement::{FrameId, Placement};
pub use spatial::{skew, SpatialForce};
pub use state::{StateModel, StateMultibody, StateVector};

// Re-export math types for convenience
pub use nalgebra::{DMatrix, DVector, Matrix3, UnitQuaternion, Vector3};

/// Result type for residual and cost operations.
pub type Result<T> = std::result::Result<T, SimError>;
