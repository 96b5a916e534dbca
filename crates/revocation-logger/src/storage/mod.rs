//! Revocation bucket storage
//!
//! This module provides a trait-based abstraction over the logger's
//! revocation state: one bucket per (CA, category) pair holding the merged
//! CRV, plus the attestation most recently published for it.
//!
//! Each pair lives in its own slot behind its own lock. The engine holds a
//! slot's lock for the whole verify-merge-reissue step, so updates to one
//! pair are serialized while updates to different pairs never contend.

pub mod memory;

pub use memory::MemoryStore;

use parking_lot::Mutex;
use revocation_core::{Crv, SignedRevocationDigest};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Identifies one bucket: a CA and one of its revocation categories
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub ca_id: String,
    pub revocation_type: String,
}

impl BucketKey {
    pub fn new(ca_id: impl Into<String>, revocation_type: impl Into<String>) -> Self {
        Self {
            ca_id: ca_id.into(),
            revocation_type: revocation_type.into(),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ca_id, self.revocation_type)
    }
}

/// State held for one bucket key
///
/// A slot is created when a submission for its key is first examined; the
/// bucket itself only appears on the first commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketSlot {
    bucket: Option<Crv>,
    published: Option<SignedRevocationDigest>,
}

impl BucketSlot {
    /// Current bucket, or a fresh all-zero one of `capacity` bits
    ///
    /// Does not store the fresh bucket; only `commit` does.
    pub fn get_or_init(&self, capacity: u64) -> Crv {
        self.bucket
            .clone()
            .unwrap_or_else(|| Crv::new(capacity))
    }

    /// Replace the bucket with a merged state
    pub fn commit(&mut self, bucket: Crv) {
        self.bucket = Some(bucket);
    }

    /// Replace the current attestation
    pub fn publish(&mut self, srd: SignedRevocationDigest) {
        self.published = Some(srd);
    }

    pub fn bucket(&self) -> Option<&Crv> {
        self.bucket.as_ref()
    }

    pub fn published(&self) -> Option<&SignedRevocationDigest> {
        self.published.as_ref()
    }

    /// Nothing committed or published yet
    pub fn is_empty(&self) -> bool {
        self.bucket.is_none() && self.published.is_none()
    }
}

/// Storage backend trait for revocation buckets
///
/// Implementations must be thread-safe and support concurrent access.
pub trait BucketStore: Send + Sync + Debug {
    /// Slot for `key`, created empty on first use
    ///
    /// Callers lock the slot for the duration of one read-modify-write.
    fn slot(&self, key: &BucketKey) -> Arc<Mutex<BucketSlot>>;

    /// Drop the slot for `key` if it holds nothing and no caller still has it
    ///
    /// Called after a rejected submission so that failed claims cannot grow
    /// the store.
    fn release_if_empty(&self, key: &BucketKey);

    /// Copy of the slot for `key`, without creating it
    fn get(&self, key: &BucketKey) -> Option<BucketSlot>;

    /// Every committed bucket, ordered by key
    ///
    /// Each bucket is read under its own lock; the snapshot as a whole is not
    /// atomic across keys.
    fn snapshot_all(&self) -> Vec<(BucketKey, Crv)>;

    /// Every published attestation, ordered by key
    fn published(&self) -> Vec<(BucketKey, SignedRevocationDigest)>;

    /// Number of committed buckets
    fn bucket_count(&self) -> usize {
        self.snapshot_all().len()
    }
}
