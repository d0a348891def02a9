//! Contact inputs for contact-based residuals.
//!
//! This crate provides the data a contact residual reads from the kinematics
//! engine at each trajectory node:
//!
//! - [`FootGeometry`] - Rectangular sole attached to a joint
//! - [`ContactData`] - Placements, contact force and their Jacobians
//! - [`DataCollector`] - Per-node storage shared between the engine and the
//!   residual data
//!
//! # Contact Model
//!
//! The contact force is expressed in the parent joint frame together with its
//! derivatives with respect to the state tangent and the control:
//!
//! ```text
//! f      = [τ; f_lin]          (6)
//! ∂f/∂x                       (6 × ndx)
//! ∂f/∂u                       (6 × nu)
//! ```
//!
//! The contact residual re-expresses it about the sole origin with
//! world-aligned axes (see [`ContactData::world_force`]).
//!
//! # Example
//!
//! ```
//! use sim_contact::{ContactData, DataCollector, FootGeometry};
//! use sim_types::{FrameId, JointId, Placement, SpatialForce, Vector3};
//!
//! let foot = FootGeometry::humanoid(FrameId::new(1), JointId::new(0));
//! let mut collector = DataCollector::new();
//! collector.insert(
//!     ContactData::new(&foot, 6, 0)
//!         .with_frame_offset(Placement::from_translation(Vector3::new(0.0, 0.0, -0.08))),
//! );
//!
//! collector
//!     .update(foot.frame, |c| {
//!         c.set_joint_placement(Placement::from_translation(Vector3::new(0.0, 0.0, 0.08)));
//!         c.force = SpatialForce::new(Vector3::new(0.0, 0.0, 600.0), Vector3::zeros());
//!     })
//!     .unwrap();
//!
//! let contact = collector.contact(foot.frame).unwrap();
//! let contact = contact.read().unwrap();
//! assert!(contact.frame_placement.translation.norm() < 1e-12);
//! assert_eq!(contact.world_force().linear.z, 600.0);
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//!
//! - Trajectory optimisation back ends
//! - Hardware control code
//! - Analysis tools

#![doc(html_root_url = "https://docs.rs/sim-contact/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::missing_errors_doc)]

mod collector;
mod contact;
mod geometry;

pub use collector::{read_contact, write_contact, DataCollector, SharedContact};
pub use contact::ContactData;
pub use geometry::FootGeometry;

// Re-export types needed for contact computation
pub use sim_types::{FrameId, JointId, Placement, Result, SimError, SpatialForce, Vector3};

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;

    #[test]
    fn test_engine_refresh_roundtrip() {
        let foot = FootGeometry::humanoid(FrameId::new(2), JointId::new(1));
        let mut collector = DataCollector::new();
        let handle = collector.insert(ContactData::new(&foot, 7, 1));

        for step in 0..3 {
            let z = f64::from(step) * 0.1;
            collector
                .update(foot.frame, |c| {
                    c.set_joint_placement(Placement::new(
                        UnitQuaternion::identity(),
                        Vector3::new(0.0, 0.0, z),
                    ));
                })
                .unwrap();
            let contact = read_contact(&handle).unwrap();
            assert!((contact.frame_placement.translation.z - z).abs() < 1e-12);
        }
    }

    #[test]
    fn test_collector_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DataCollector>();
        assert_send_sync::<SharedContact>();
    }
}
