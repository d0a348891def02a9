//! Contact centre-of-pressure residual.
//!
//! The contact force `f` arrives in the parent joint frame. It is moved to the
//! contact frame origin and rotated into world-aligned axes:
//!
//! ```text
//! M   = (R_i, −R_i·p)          p = jMf.translation
//! f_w = M · f                  (f_w.linear = R_i f, f_w.angular = R_i (τ − p × f))
//! cop = (−τ_y / f_z, τ_x / f_z, 0)   from f_w, offset from the frame origin
//! r   = oMf.translation − cop                    (CopFrame::World)
//! r   = −R_fᵀ cop                                (CopFrame::Sole)
//! ```
//!
//! The sole expression is the foot position minus the CoP as a world point
//! `oMf.translation + cop`, rotated into the contact frame. Its first two
//! components are what a [`Footprint`](crate::Footprint) bounds.
//!
//! # Derivatives
//!
//! `R_i` moves with the configuration, `δR_i = [Jω δq]× R_i`, and every
//! component of `f_w` is `R_i` applied to a configuration-independent vector:
//!
//! ```text
//! ∂f_w/∂q     = −[f_w]× Jω                     (linear and angular parts)
//! ∂f_w/∂(x,u) += R_i · (∂f, ∂τ − [p]× ∂f)
//! ∂cop_x      = −∂τ_y / f_z + τ_y ∂f_z / f_z²
//! ∂cop_y      =  ∂τ_x / f_z − τ_x ∂f_z / f_z²
//! ```
//!
//! World frame: `Rx = [Jp | 0] − ∂cop/∂x` and `Ru = −∂cop/∂u`. The contact
//! frame rides on the parent joint, so `δR_f = [Jω δq]× R_f` as well and the
//! sole frame gives `Rx = −R_fᵀ (∂cop/∂x + [cop]× [Jω | 0])`,
//! `Ru = −R_fᵀ ∂cop/∂u`.
//!
//! `calc_diff` linearises around the force and CoP stored by `calc`, so an
//! engine refresh in between does not desynchronise value and derivatives.
//!
//! # Unloaded contacts
//!
//! When `|f_z|` falls below [`CopConfig::min_normal_force`], the CoP is
//! undefined. [`DegenerateCopPolicy::FootOrigin`] puts it at the frame origin
//! with zero derivatives; [`DegenerateCopPolicy::Error`] fails with
//! [`SimError::DegenerateContact`].

use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Matrix3, Matrix3xX, Vector3};
use sim_contact::{read_contact, ContactData, DataCollector, FootGeometry};
use sim_types::spatial::{ANGULAR, LINEAR};
use sim_types::{
    skew, CopConfig, CopFrame, DegenerateCopPolicy, Result, SimError, SpatialForce, StateModel,
};
use tracing::{debug, trace};

use super::{ContactCopScratch, Residual, ResidualData, ResidualScratch};

/// Residual between a foot position and the centre of pressure under it.
#[derive(Debug, Clone)]
pub struct ResidualContactCop {
    state: Arc<dyn StateModel>,
    nu: usize,
    foot: FootGeometry,
    config: CopConfig,
    frame: CopFrame,
}

impl ResidualContactCop {
    /// Create the residual for a foot.
    pub fn new(
        state: Arc<dyn StateModel>,
        nu: usize,
        foot: FootGeometry,
        config: CopConfig,
    ) -> Result<Self> {
        foot.validate()?;
        config.validate()?;
        debug!(
            frame = %foot.frame,
            joint = %foot.joint,
            nu,
            policy = %config.degenerate_policy,
            "created contact CoP residual"
        );
        Ok(Self {
            state,
            nu,
            foot,
            config,
            frame: CopFrame::World,
        })
    }

    /// Express the residual in `frame`.
    #[must_use]
    pub fn with_frame(mut self, frame: CopFrame) -> Self {
        self.frame = frame;
        self
    }

    /// Create the residual with `nu = nv` and default configuration.
    pub fn with_default_nu(state: Arc<dyn StateModel>, foot: FootGeometry) -> Result<Self> {
        let nu = state.nv();
        Self::new(state, nu, foot, CopConfig::default())
    }

    /// The foot this residual is attached to.
    #[must_use]
    pub fn foot(&self) -> &FootGeometry {
        &self.foot
    }

    /// CoP configuration.
    #[must_use]
    pub fn config(&self) -> &CopConfig {
        &self.config
    }

    /// Frame the residual is expressed in.
    #[must_use]
    pub fn frame(&self) -> CopFrame {
        self.frame
    }

    /// Apply the degenerate-contact policy. Returns `true` when the CoP must
    /// fall back to the frame origin.
    fn is_unloaded(&self, world_force: &SpatialForce) -> Result<bool> {
        let fz = world_force.linear.z;
        if !self.config.is_degenerate(fz) {
            return Ok(false);
        }
        match self.config.degenerate_policy {
            DegenerateCopPolicy::FootOrigin => Ok(true),
            DegenerateCopPolicy::Error => Err(SimError::DegenerateContact {
                normal_force: fz,
                threshold: self.config.min_normal_force,
            }),
        }
    }
}

fn cop_scratch(scratch: &mut ResidualScratch) -> Result<&mut ContactCopScratch> {
    match scratch {
        ResidualScratch::ContactCop(scratch) => Ok(scratch),
        _ => Err(SimError::invalid_config(
            "residual data was not created by a contact CoP residual",
        )),
    }
}

/// Centre of pressure of a loaded world-aligned force.
fn centre_of_pressure(force: &SpatialForce) -> Vector3<f64> {
    let fz = force.linear.z;
    Vector3::new(-force.angular.y / fz, force.angular.x / fz, 0.0)
}

/// Derivative of `M · f` with respect to the columns of `df` (local `[τ; f]`
/// rows), not counting the motion of `R_i`. Returns `(∂τ_w, ∂f_w)`.
fn world_force_derivative(
    rotation: &Matrix3<f64>,
    offset: &Vector3<f64>,
    df: &DMatrix<f64>,
) -> (Matrix3xX<f64>, Matrix3xX<f64>) {
    let dtau = df.fixed_rows::<3>(ANGULAR);
    let dlin = df.fixed_rows::<3>(LINEAR);
    let dlin_w = rotation * &dlin;
    let dtau_w = rotation * (dtau - skew(offset) * &dlin);
    (dtau_w, dlin_w)
}

/// Jacobian of the CoP given the derivatives of the world force.
fn cop_jacobian(
    force: &SpatialForce,
    dtau: &Matrix3xX<f64>,
    dlin: &Matrix3xX<f64>,
) -> Matrix3xX<f64> {
    let fz = force.linear.z;
    let fz2 = fz * fz;
    let (tx, ty) = (force.angular.x, force.angular.y);
    let dfz = dlin.row(2);

    let mut dcop = Matrix3xX::<f64>::zeros(dtau.ncols());
    dcop.row_mut(0)
        .copy_from(&(dfz * (ty / fz2) - dtau.row(1) / fz));
    dcop.row_mut(1)
        .copy_from(&(dtau.row(0) / fz - dfz * (tx / fz2)));
    dcop
}

/// `(∂cop/∂x, ∂cop/∂u)` for a loaded contact.
fn cop_derivatives(
    contact: &ContactData,
    world_force: &SpatialForce,
    nv: usize,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let rotation = contact.joint_placement.rotation_matrix();
    let offset = contact.frame_offset.translation;

    let (mut dtau_x, mut dlin_x) = world_force_derivative(&rotation, &offset, &contact.df_dx);
    let jw = &contact.joint_angular_jacobian;
    let mut q_block = dtau_x.columns_mut(0, nv);
    q_block -= skew(&world_force.angular) * jw;
    let mut q_block = dlin_x.columns_mut(0, nv);
    q_block -= skew(&world_force.linear) * jw;
    let dcop_x = cop_jacobian(world_force, &dtau_x, &dlin_x);

    let (dtau_u, dlin_u) = world_force_derivative(&rotation, &offset, &contact.df_du);
    let dcop_u = cop_jacobian(world_force, &dtau_u, &dlin_u);

    (
        DMatrix::from_column_slice(3, dcop_x.ncols(), dcop_x.as_slice()),
        DMatrix::from_column_slice(3, dcop_u.ncols(), dcop_u.as_slice()),
    )
}

impl Residual for ResidualContactCop {
    fn state(&self) -> &Arc<dyn StateModel> {
        &self.state
    }

    fn nu(&self) -> usize {
        self.nu
    }

    fn nr(&self) -> usize {
        3
    }

    fn calc(&self, data: &mut ResidualData, x: &DVector<f64>, u: &DVector<f64>) -> Result<()> {
        self.check_inputs(x, u)?;
        data.check_shape(self.nr(), self.state.ndx(), self.nu)?;
        data.invalidate();
        let nv = self.state.nv();

        let ResidualData { r, scratch, .. } = &mut *data;
        let scratch = cop_scratch(scratch)?;
        let (world_force, foot_position, frame_rotation) = {
            let contact = read_contact(&scratch.contact)?;
            contact.check_dimensions(nv, self.nu)?;
            (
                contact.world_force(),
                contact.frame_placement.translation,
                contact.frame_placement.rotation_matrix(),
            )
        };

        let degenerate = self.is_unloaded(&world_force)?;
        let cop = if degenerate {
            debug!(
                frame = %self.foot.frame,
                normal_force = world_force.linear.z,
                threshold = self.config.min_normal_force,
                "unloaded contact, placing centre of pressure at the frame origin"
            );
            Vector3::zeros()
        } else {
            centre_of_pressure(&world_force)
        };

        let residual = match self.frame {
            CopFrame::World => foot_position - cop,
            CopFrame::Sole => -(frame_rotation.transpose() * cop),
        };
        scratch.world_force = world_force;
        scratch.foot_position = foot_position;
        scratch.frame_rotation = frame_rotation;
        scratch.cop = cop;
        scratch.degenerate = degenerate;
        r.copy_from_slice(residual.as_slice());

        data.mark_evaluated();
        trace!(frame = %self.foot.frame, cop_x = cop.x, cop_y = cop.y, "contact CoP residual");
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

        let ResidualData { rx, ru, scratch, .. } = data;
        let scratch = cop_scratch(scratch)?;
        let contact = read_contact(&scratch.contact)?;
        contact.check_dimensions(nv, self.nu)?;

        if scratch.degenerate {
            scratch.dcop_dx.fill(0.0);
            scratch.dcop_du.fill(0.0);
        } else {
            let (dcop_dx, dcop_du) = cop_derivatives(&contact, &scratch.world_force, nv);
            scratch.dcop_dx = dcop_dx;
            scratch.dcop_du = dcop_du;
        }

        match self.frame {
            CopFrame::World => {
                rx.copy_from(&scratch.dcop_dx);
                rx.neg_mut();
                let mut q_block = rx.view_mut((0, 0), (3, nv));
                q_block += &contact.frame_linear_jacobian;
                ru.copy_from(&scratch.dcop_du);
                ru.neg_mut();
            }
            CopFrame::Sole => {
                let rotation_t = scratch.frame_rotation.transpose();
                let mut dcop_dx = scratch.dcop_dx.clone();
                let mut q_block = dcop_dx.columns_mut(0, nv);
                q_block += skew(&scratch.cop) * &contact.joint_angular_jacobian;
                rx.copy_from(&(rotation_t * &dcop_dx));
                rx.neg_mut();
                ru.copy_from(&(rotation_t * &scratch.dcop_du));
                ru.neg_mut();
            }
        }
        Ok(())
    }

    fn create_data(&self, collector: &DataCollector) -> Result<ResidualData> {
        let contact = collector.contact(self.foot.frame)?;
        {
            let guard = read_contact(&contact)?;
            if guard.joint != self.foot.joint {
                return Err(SimError::invalid_geometry(format!(
                    "{} is attached to {}, expected {}",
                    self.foot.frame, guard.joint, self.foot.joint
                )));
            }
        }
        let ndx = self.state.ndx();
        Ok(
            ResidualData::new(self.nr(), ndx, self.nu).with_scratch(ResidualScratch::ContactCop(
                ContactCopScratch {
                    contact,
                    world_force: SpatialForce::zero(),
                    foot_position: Vector3::zeros(),
                    frame_rotation: Matrix3::identity(),
                    cop: Vector3::zeros(),
                    dcop_dx: DMatrix::zeros(3, ndx),
                    dcop_du: DMatrix::zeros(3, self.nu),
                    degenerate: false,
                },
            )),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use sim_types::{FrameId, JointId, Placement, StateMultibody};

    const FRAME: FrameId = FrameId(11);
    const JOINT: JointId = JointId(0);

    fn foot() -> FootGeometry {
        FootGeometry::new(FRAME, JOINT, 0.2, 0.1)
    }

    fn setup(config: CopConfig) -> (ResidualContactCop, DataCollector) {
        let state = Arc::new(StateMultibody::floating_base(0));
        let residual = ResidualContactCop::new(state, 2, foot(), config).unwrap();
        let mut collector = DataCollector::new();
        collector.insert(ContactData::new(&foot(), 6, 2));
        (residual, collector)
    }

    fn inputs() -> (DVector<f64>, DVector<f64>) {
        let state = StateMultibody::floating_base(0);
        (state.zero(), DVector::zeros(2))
    }

    #[test]
    fn test_vertical_force_cop_at_origin() {
        let (residual, collector) = setup(CopConfig::default());
        collector
            .update(FRAME, |c| {
                c.set_joint_placement(Placement::from_translation(Vector3::new(0.3, -0.1, 0.0)));
                c.force = SpatialForce::new(Vector3::new(0.0, 0.0, 10.0), Vector3::zeros());
            })
            .unwrap();

        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        residual.calc(&mut data, &x, &u).unwrap();
        assert_relative_eq!(data.r[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(data.r[1], -0.1, epsilon = 1e-12);
        assert_relative_eq!(data.r[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_torque_shifts_cop() {
        let (residual, collector) = setup(CopConfig::default());
        collector
            .update(FRAME, |c| {
                // Pitch torque about the joint: the pressure centre moves forward.
                c.force = SpatialForce::new(
                    Vector3::new(0.0, 0.0, 100.0),
                    Vector3::new(0.0, -5.0, 0.0),
                );
            })
            .unwrap();

        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        residual.calc(&mut data, &x, &u).unwrap();
        let ResidualScratch::ContactCop(scratch) = &data.scratch else {
            panic!("wrong scratch variant");
        };
        assert_relative_eq!(scratch.cop, Vector3::new(0.05, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(data.r[0], -0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_frame_offset_moves_reference_point() {
        let (residual, collector) = setup(CopConfig::default());
        collector
            .update(FRAME, |c| {
                c.frame_offset = Placement::from_translation(Vector3::new(0.05, 0.0, 0.0));
                c.set_joint_placement(Placement::new(
                    UnitQuaternion::from_euler_angles(0.0, 0.0, 0.4),
                    Vector3::zeros(),
                ));
                c.force = SpatialForce::new(Vector3::new(0.0, 0.0, 50.0), Vector3::zeros());
            })
            .unwrap();

        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        residual.calc(&mut data, &x, &u).unwrap();
        // The force acts at the joint origin, 5 cm behind the frame along the rotated X axis.
        let behind =
            UnitQuaternion::from_euler_angles(0.0, 0.0, 0.4) * Vector3::new(-0.05, 0.0, 0.0);
        let ResidualScratch::ContactCop(scratch) = &data.scratch else {
            panic!("wrong scratch variant");
        };
        assert_relative_eq!(scratch.cop, behind, epsilon = 1e-12);
    }

    #[test]
    fn test_sole_frame_follows_foot_yaw() {
        let (residual, collector) = setup(CopConfig::default());
        let residual = residual.with_frame(CopFrame::Sole);
        assert_eq!(residual.frame(), CopFrame::Sole);
        let yaw = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        collector
            .update(FRAME, |c| {
                c.set_joint_placement(Placement::new(yaw, Vector3::new(1.0, 0.5, 0.0)));
                // Pressure 10 cm ahead along the sole's X axis.
                c.force = SpatialForce::new(
                    Vector3::new(0.0, 0.0, 600.0),
                    Vector3::new(0.0, -60.0, 0.0),
                );
            })
            .unwrap();

        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        residual.calc(&mut data, &x, &u).unwrap();
        let ResidualScratch::ContactCop(scratch) = &data.scratch else {
            panic!("wrong scratch variant");
        };
        // World offset points along +Y after the yaw; the sole sees it along X.
        assert_relative_eq!(scratch.cop, Vector3::new(0.0, 0.1, 0.0), epsilon = 1e-12);
        assert_relative_eq!(data.r, DVector::from_vec(vec![-0.1, 0.0, 0.0]), epsilon = 1e-12);
    }

    #[test]
    fn test_sole_frame_is_zero_for_unloaded_contact() {
        let (residual, collector) = setup(CopConfig::default());
        let residual = residual.with_frame(CopFrame::Sole);
        collector
            .update(FRAME, |c| {
                c.set_joint_placement(Placement::from_translation(Vector3::new(1.0, 2.0, 0.0)));
            })
            .unwrap();

        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        residual.calc(&mut data, &x, &u).unwrap();
        residual.calc_diff(&mut data, &x, &u).unwrap();
        assert_relative_eq!(data.r.norm(), 0.0);
        assert_relative_eq!(data.rx.norm(), 0.0);
        assert_relative_eq!(data.ru.norm(), 0.0);
    }

    #[test]
    fn test_calc_diff_uses_force_from_calc() {
        let (residual, collector) = setup(CopConfig::default());
        collector
            .update(FRAME, |c| {
                c.force = SpatialForce::new(Vector3::new(0.0, 0.0, 20.0), Vector3::zeros());
                c.df_du[(ANGULAR, 0)] = 1.0;
            })
            .unwrap();

        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        residual.calc(&mut data, &x, &u).unwrap();
        // The engine unloads the contact before the derivatives are taken.
        collector.update(FRAME, |c| c.force = SpatialForce::zero()).unwrap();
        residual.calc_diff(&mut data, &x, &u).unwrap();
        assert_relative_eq!(data.ru[(1, 0)], -0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_falls_back_to_origin() {
        let (residual, collector) = setup(CopConfig::default());
        collector
            .update(FRAME, |c| {
                c.set_joint_placement(Placement::from_translation(Vector3::new(1.0, 2.0, 3.0)));
                c.force = SpatialForce::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 0.0));
                c.df_dx.fill(1.0);
            })
            .unwrap();

        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        residual.calc(&mut data, &x, &u).unwrap();
        assert_relative_eq!(data.r, DVector::from_vec(vec![1.0, 2.0, 3.0]));

        residual.calc_diff(&mut data, &x, &u).unwrap();
        assert_relative_eq!(data.ru.norm(), 0.0);
        let ResidualScratch::ContactCop(scratch) = &data.scratch else {
            panic!("wrong scratch variant");
        };
        assert!(scratch.degenerate);
        assert_relative_eq!(scratch.dcop_dx.norm(), 0.0);
    }

    #[test]
    fn test_degenerate_errors_under_strict_policy() {
        let (residual, collector) = setup(CopConfig::strict());
        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        let err = residual.calc(&mut data, &x, &u).unwrap_err();
        assert!(matches!(err, SimError::DegenerateContact { .. }));
        assert!(!data.is_evaluated());
    }

    #[test]
    fn test_create_data_needs_contact() {
        let state = Arc::new(StateMultibody::floating_base(0));
        let residual = ResidualContactCop::with_default_nu(state, foot()).unwrap();
        let err = residual.create_data(&DataCollector::new()).unwrap_err();
        assert_eq!(err, SimError::ContactNotFound(FRAME));
    }

    #[test]
    fn test_create_data_checks_joint() {
        let state = Arc::new(StateMultibody::floating_base(0));
        let residual = ResidualContactCop::with_default_nu(state, foot()).unwrap();
        let mut collector = DataCollector::new();
        let other = FootGeometry::new(FRAME, JointId::new(5), 0.2, 0.1);
        collector.insert(ContactData::new(&other, 6, 6));
        assert!(matches!(
            residual.create_data(&collector).unwrap_err(),
            SimError::InvalidGeometry { .. }
        ));
    }

    #[test]
    fn test_contact_sized_for_other_control_is_rejected() {
        let state = Arc::new(StateMultibody::floating_base(0));
        let residual = ResidualContactCop::new(state, 3, foot(), CopConfig::default()).unwrap();
        let mut collector = DataCollector::new();
        collector.insert(ContactData::new(&foot(), 6, 2));
        let mut data = residual.create_data(&collector).unwrap();
        let x = StateMultibody::floating_base(0).zero();
        let err = residual.calc(&mut data, &x, &DVector::zeros(3)).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_control_jacobian_of_vertical_load() {
        let (residual, collector) = setup(CopConfig::default());
        collector
            .update(FRAME, |c| {
                c.force = SpatialForce::new(Vector3::new(0.0, 0.0, 20.0), Vector3::zeros());
                // u0 adds roll torque, u1 adds normal force.
                c.df_du[(ANGULAR, 0)] = 1.0;
                c.df_du[(LINEAR + 2, 1)] = 1.0;
            })
            .unwrap();

        let mut data = residual.create_data(&collector).unwrap();
        let (x, u) = inputs();
        residual.calc(&mut data, &x, &u).unwrap();
        residual.calc_diff(&mut data, &x, &u).unwrap();

        // cop_y = τ_x / f_z, so ∂cop_y/∂u0 = 1/20 and r_y = -cop_y.
        assert_relative_eq!(data.ru[(1, 0)], -0.05, epsilon = 1e-12);
        // Zero torque: changing f_z does not move the CoP.
        assert_relative_eq!(data.ru[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(data.ru[(2, 0)], 0.0);
    }
}
