//! Per-node contact data.
//!
//! [`ContactData`] holds everything a contact residual reads from the
//! kinematics engine at one trajectory node. The engine owns the numbers and
//! refreshes them before every evaluation; residuals only read them.
//!
//! Jacobian conventions:
//!
//! - `df_dx` is `6 × ndx` and `df_du` is `6 × nu`, rows laid out `[τ; f]` like
//!   [`SpatialForce::to_vector`].
//! - `joint_angular_jacobian` maps the configuration tangent (`nv`) to the
//!   world-frame angular velocity of the parent joint.
//! - `frame_linear_jacobian` maps the configuration tangent to the world-frame
//!   velocity of the contact frame origin.

use nalgebra::DMatrix;
use sim_types::{ensure_dimension, FrameId, JointId, Placement, SpatialForce};

use crate::FootGeometry;

/// Kinematic and force inputs of one contact at one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactData {
    /// Parent joint of the contact frame.
    pub joint: JointId,
    /// Contact frame.
    pub frame: FrameId,
    /// World placement of the parent joint (`oMi`).
    pub joint_placement: Placement,
    /// Placement of the contact frame in the joint frame (`jMf`).
    pub frame_offset: Placement,
    /// World placement of the contact frame (`oMf`).
    pub frame_placement: Placement,
    /// Contact force expressed in the parent joint frame.
    pub force: SpatialForce,
    /// Derivative of `force` with respect to the state tangent.
    pub df_dx: DMatrix<f64>,
    /// Derivative of `force` with respect to the control.
    pub df_du: DMatrix<f64>,
    /// World angular Jacobian of the parent joint (`3 × nv`).
    pub joint_angular_jacobian: DMatrix<f64>,
    /// World translational Jacobian of the contact frame (`3 × nv`).
    pub frame_linear_jacobian: DMatrix<f64>,
}

impl ContactData {
    /// Create zeroed contact data for a foot on a system with `nv` velocity
    /// coordinates and `nu` controls.
    #[must_use]
    pub fn new(foot: &FootGeometry, nv: usize, nu: usize) -> Self {
        Self {
            joint: foot.joint,
            frame: foot.frame,
            joint_placement: Placement::identity(),
            frame_offset: Placement::identity(),
            frame_placement: Placement::identity(),
            force: SpatialForce::zero(),
            df_dx: DMatrix::zeros(6, 2 * nv),
            df_du: DMatrix::zeros(6, nu),
            joint_angular_jacobian: DMatrix::zeros(3, nv),
            frame_linear_jacobian: DMatrix::zeros(3, nv),
        }
    }

    /// Set the fixed joint-to-frame offset.
    #[must_use]
    pub fn with_frame_offset(mut self, offset: Placement) -> Self {
        self.frame_offset = offset;
        self.frame_placement = self.joint_placement.compose(&offset);
        self
    }

    /// Set the world placement of the parent joint and derive the frame placement.
    pub fn set_joint_placement(&mut self, placement: Placement) {
        self.joint_placement = placement;
        self.frame_placement = placement.compose(&self.frame_offset);
    }

    /// Number of velocity coordinates the Jacobians were sized for.
    #[must_use]
    pub fn nv(&self) -> usize {
        self.joint_angular_jacobian.ncols()
    }

    /// Number of controls the force derivative was sized for.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.df_du.ncols()
    }

    /// Check that every matrix has the shape a model with `nv`/`nu` expects.
    pub fn check_dimensions(&self, nv: usize, nu: usize) -> sim_types::Result<()> {
        ensure_dimension("contact df_dx rows", 6, self.df_dx.nrows())?;
        ensure_dimension("contact df_dx columns", 2 * nv, self.df_dx.ncols())?;
        ensure_dimension("contact df_du rows", 6, self.df_du.nrows())?;
        ensure_dimension("contact df_du columns", nu, self.df_du.ncols())?;
        ensure_dimension("joint angular jacobian rows", 3, self.joint_angular_jacobian.nrows())?;
        ensure_dimension(
            "joint angular jacobian columns",
            nv,
            self.joint_angular_jacobian.ncols(),
        )?;
        ensure_dimension("frame linear jacobian rows", 3, self.frame_linear_jacobian.nrows())?;
        ensure_dimension(
            "frame linear jacobian columns",
            nv,
            self.frame_linear_jacobian.ncols(),
        )
    }

    /// Placement taking forces from the joint frame to world-aligned axes at
    /// the contact frame origin: `(R_i, -R_i · jMf.p)`.
    #[must_use]
    pub fn world_aligned_at_frame(&self) -> Placement {
        let rotation = self.joint_placement.rotation;
        Placement::new(rotation, -(rotation * self.frame_offset.translation))
    }

    /// Contact force about the contact frame origin, in world-aligned axes.
    #[must_use]
    pub fn world_force(&self) -> SpatialForce {
        self.world_aligned_at_frame().act_force(&self.force)
    }
}
