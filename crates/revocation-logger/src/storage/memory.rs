//! In-memory storage backend
//!
//! Default storage implementation: a map of per-key slots behind a
//! read-write lock. The map lock is only held to find or insert a slot,
//! never while a slot is being updated. Data is lost on restart.

use parking_lot::{Mutex, RwLock};
use revocation_core::{Crv, SignedRevocationDigest};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{BucketKey, BucketSlot, BucketStore};

/// In-memory bucket store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<BTreeMap<BucketKey, Arc<Mutex<BucketSlot>>>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn all_slots(&self) -> Vec<(BucketKey, Arc<Mutex<BucketSlot>>)> {
        self.slots
            .read()
            .iter()
            .map(|(key, slot)| (key.clone(), Arc::clone(slot)))
            .collect()
    }
}

impl BucketStore for MemoryStore {
    fn slot(&self, key: &BucketKey) -> Arc<Mutex<BucketSlot>> {
        if let Some(slot) = self.slots.read().get(key) {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write();
        Arc::clone(slots.entry(key.clone()).or_insert_with(|| {
            debug!(key = %key, "Creating bucket slot");
            Arc::new(Mutex::new(BucketSlot::default()))
        }))
    }

    fn release_if_empty(&self, key: &BucketKey) {
        let mut slots = self.slots.write();
        // With the map locked nobody can take a new handle, so a count of one
        // means no other submission is working on this slot
        let idle = slots
            .get(key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1 && slot.lock().is_empty());
        if idle {
            slots.remove(key);
            debug!(key = %key, "Released empty bucket slot");
        }
    }

    fn get(&self, key: &BucketKey) -> Option<BucketSlot> {
        let slot = self.slots.read().get(key).map(Arc::clone)?;
        let copy = slot.lock().clone();
        Some(copy)
    }

    fn snapshot_all(&self) -> Vec<(BucketKey, Crv)> {
        self.all_slots()
            .into_iter()
            .filter_map(|(key, slot)| {
                let bucket = slot.lock().bucket().cloned();
                bucket.map(|crv| (key, crv))
            })
            .collect()
    }

    fn published(&self) -> Vec<(BucketKey, SignedRevocationDigest)> {
        self.all_slots()
            .into_iter()
            .filter_map(|(key, slot)| {
                let srd = slot.lock().published().cloned();
                srd.map(|srd| (key, srd))
            })
            .collect()
    }
}
