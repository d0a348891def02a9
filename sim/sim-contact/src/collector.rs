//! Shared per-node data collector.
//!
//! The kinematics engine writes contact data into a [`DataCollector`] before
//! each evaluation; residual data created from the collector keeps a handle to
//! the same storage and reads it under a lock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use sim_types::{FrameId, SimError};
use tracing::debug;

use crate::ContactData;

/// Contact data shared between the engine and residual data.
pub type SharedContact = Arc<RwLock<ContactData>>;

/// Lock shared contact data for reading.
pub fn read_contact(
    contact: &SharedContact,
) -> sim_types::Result<RwLockReadGuard<'_, ContactData>> {
    contact.read().map_err(|_| SimError::CollectorPoisoned)
}

/// Lock shared contact data for writing.
pub fn write_contact(
    contact: &SharedContact,
) -> sim_types::Result<RwLockWriteGuard<'_, ContactData>> {
    contact.write().map_err(|_| SimError::CollectorPoisoned)
}

/// Per-node inputs supplied by the kinematics engine, keyed by contact frame.
///
/// Cloning a collector clones the handles, not the data.
///
/// # Example
///
/// ```
/// use sim_contact::{ContactData, DataCollector, FootGeometry};
/// use sim_types::{FrameId, JointId, SpatialForce, Vector3};
///
/// let foot = FootGeometry::humanoid(FrameId::new(7), JointId::new(3));
/// let mut collector = DataCollector::new();
/// collector.insert(ContactData::new(&foot, 12, 6));
///
/// collector
///     .update(foot.frame, |c| {
///         c.force = SpatialForce::new(Vector3::new(0.0, 0.0, 300.0), Vector3::zeros());
///     })
///     .unwrap();
///
/// let shared = collector.contact(foot.frame).unwrap();
/// assert_eq!(shared.read().unwrap().force.linear.z, 300.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataCollector {
    contacts: HashMap<FrameId, SharedContact>,
}

impl DataCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register contact data, replacing any previous entry for the same frame.
    pub fn insert(&mut self, data: ContactData) -> SharedContact {
        let frame = data.frame;
        debug!(%frame, joint = %data.joint, nv = data.nv(), nu = data.nu(), "registered contact");
        let shared = Arc::new(RwLock::new(data));
        self.contacts.insert(frame, Arc::clone(&shared));
        shared
    }

    /// Handle to the contact data of a frame.
    pub fn contact(&self, frame: FrameId) -> sim_types::Result<SharedContact> {
        self.contacts
            .get(&frame)
            .cloned()
            .ok_or(SimError::ContactNotFound(frame))
    }

    /// Modify the contact data of a frame under a write lock.
    pub fn update<F>(&self, frame: FrameId, f: F) -> sim_types::Result<()>
    where
        F: FnOnce(&mut ContactData),
    {
        let shared = self.contact(frame)?;
        let mut guard = write_contact(&shared)?;
        f(&mut *guard);
        Ok(())
    }

    /// Whether a frame has registered contact data.
    #[must_use]
    pub fn contains(&self, frame: FrameId) -> bool {
        self.contacts.contains_key(&frame)
    }

    /// Registered frames in ascending order.
    #[must_use]
    pub fn frames(&self) -> Vec<FrameId> {
        let mut frames: Vec<_> = self.contacts.keys().copied().collect();
        frames.sort_unstable();
        frames
    }

    /// Number of registered contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Check if no contact is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::FootGeometry;
    use sim_types::{JointId, SpatialForce, Vector3};

    fn foot(frame: u64) -> FootGeometry {
        FootGeometry::humanoid(FrameId::new(frame), JointId::new(1))
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut collector = DataCollector::new();
        assert!(collector.is_empty());
        collector.insert(ContactData::new(&foot(5), 6, 0));
        collector.insert(ContactData::new(&foot(2), 6, 0));

        assert_eq!(collector.len(), 2);
        assert!(collector.contains(FrameId::new(5)));
        assert_eq!(collector.frames(), vec![FrameId::new(2), FrameId::new(5)]);
    }

    #[test]
    fn test_missing_contact() {
        let collector = DataCollector::new();
        let err = collector.contact(FrameId::new(9)).unwrap_err();
        assert_eq!(err, SimError::ContactNotFound(FrameId::new(9)));
        assert!(collector.update(FrameId::new(9), |_| {}).is_err());
    }

    #[test]
    fn test_updates_are_visible_through_handles() {
        let mut collector = DataCollector::new();
        let handle = collector.insert(ContactData::new(&foot(1), 6, 0));
        let cloned = collector.clone();

        cloned
            .update(FrameId::new(1), |c| {
                c.force = SpatialForce::new(Vector3::new(0.0, 0.0, 42.0), Vector3::zeros());
            })
            .unwrap();

        assert_eq!(read_contact(&handle).unwrap().force.linear.z, 42.0);
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let mut collector = DataCollector::new();
        let handle = collector.insert(ContactData::new(&foot(1), 6, 0));

        let poisoner = Arc::clone(&handle);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("engine crashed while writing");
        })
        .join();

        assert_eq!(read_contact(&handle).unwrap_err(), SimError::CollectorPoisoned);
        assert_eq!(
            collector.update(FrameId::new(1), |_| {}).unwrap_err(),
            SimError::CollectorPoisoned
        );
    }
}
