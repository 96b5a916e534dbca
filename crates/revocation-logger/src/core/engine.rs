//! Verification, merge and reissue of CA revocation updates
//!
//! This is the security-critical path of the logger. A CA's claim is only
//! accepted once the logger has re-derived the merged state itself and found
//! that it hashes to exactly the commitment the CA signed. Only then is the
//! bucket replaced and a new attestation published under the log's key.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use revocation_core::{
    Crv, CrvCodec, HashAlgorithm, RevocationSubmission, RunLengthCodec, SignedRevocationDigest,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::LoggerError;
use crate::keys::{CaRegistry, LoggerIdentity};
use crate::storage::{BucketKey, BucketStore};

/// Applies CA submissions to the bucket store
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<CaRegistry>,
    store: Arc<dyn BucketStore>,
    identity: Arc<LoggerIdentity>,
    codec: Arc<dyn CrvCodec>,
    hash_algorithm: HashAlgorithm,
}

impl Engine {
    /// Create an engine using the run-length CRV codec and SHA-256 commitments
    pub fn new(
        registry: Arc<CaRegistry>,
        store: Arc<dyn BucketStore>,
        identity: Arc<LoggerIdentity>,
    ) -> Self {
        Self {
            registry,
            store,
            identity,
            codec: Arc::new(RunLengthCodec),
            hash_algorithm: HashAlgorithm::Sha256,
        }
    }

    /// Replace the CRV codec
    pub fn with_codec(mut self, codec: Arc<dyn CrvCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Pin the commitment hash algorithm CAs must use
    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    pub fn registry(&self) -> &CaRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn BucketStore> {
        &self.store
    }

    pub fn identity(&self) -> &LoggerIdentity {
        &self.identity
    }

    pub fn codec(&self) -> &dyn CrvCodec {
        self.codec.as_ref()
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Current bucket for a CA and category, if one has been committed
    pub fn bucket(&self, ca_id: &str, revocation_type: &str) -> Option<Crv> {
        self.store
            .get(&BucketKey::new(ca_id, revocation_type))
            .and_then(|slot| slot.bucket().cloned())
    }

    /// Verify a CA submission, merge its delta and publish a new attestation
    ///
    /// # Security
    /// The bucket and the published attestation for the submission's key are
    /// only written after every check has passed. Any error leaves them as
    /// they were.
    pub fn ingest(
        &self,
        submission: &RevocationSubmission,
    ) -> Result<SignedRevocationDigest, LoggerError> {
        let ca_id = submission.ca_id();
        let key = BucketKey::new(ca_id, submission.revocation_type());

        let entity = self.registry.lookup(ca_id).ok_or_else(|| {
            warn!(ca_id = %ca_id, "Submission from unknown CA rejected");
            LoggerError::UnknownEntity(ca_id.to_string())
        })?;

        if let Err(err) = submission.verify(&entity.public_key) {
            warn!(ca_id = %ca_id, error = %err, "SECURITY: Submission failed authentication");
            return Err(LoggerError::InvalidSignature(err.to_string()));
        }

        if submission.digest.hash_algorithm != self.hash_algorithm {
            warn!(
                ca_id = %ca_id,
                claimed = %submission.digest.hash_algorithm,
                expected = %self.hash_algorithm,
                "SECURITY: Submission committed under a foreign hash algorithm"
            );
            return Err(LoggerError::ConsistencyViolation(format!(
                "commitment uses {} but this log only accepts {}",
                submission.digest.hash_algorithm, self.hash_algorithm
            )));
        }

        let delta = self.codec.decompress(&submission.crv_delta).map_err(|err| {
            warn!(ca_id = %ca_id, error = %err, "Submission delta could not be decoded");
            LoggerError::InvalidEncoding(err.to_string())
        })?;

        let result = self.merge(&key, submission, &delta);
        if result.is_err() {
            // A rejected first submission must not leave a slot behind
            self.store.release_if_empty(&key);
        }
        result
    }

    /// Merge, check, reissue and publish under the slot lock for `key`
    fn merge(
        &self,
        key: &BucketKey,
        submission: &RevocationSubmission,
        delta: &Crv,
    ) -> Result<SignedRevocationDigest, LoggerError> {
        let slot = self.store.slot(key);
        let mut slot = slot.lock();

        let current = slot.get_or_init(delta.capacity());
        let candidate = current.union(delta);

        let compressed = self.codec.compress(&candidate);
        let computed = self.hash_algorithm.digest(&compressed);

        if computed != submission.digest.crv_hash {
            let claimed = STANDARD.encode(&submission.digest.crv_hash);
            let computed = STANDARD.encode(&computed);
            warn!(
                key = %key,
                claimed = %claimed,
                computed = %computed,
                "SECURITY: Commitment does not match merged state"
            );
            return Err(LoggerError::ConsistencyViolation(format!(
                "claimed {} hash {} but merged state hashes to {}",
                self.hash_algorithm, claimed, computed
            )));
        }

        // The CA's verified claim now describes the merged state exactly
        let srd = self
            .identity
            .issue(submission.digest.clone(), compressed, submission.crv_delta.clone())
            .map_err(|err| LoggerError::Internal(err.to_string()))?;

        debug!(
            key = %key,
            capacity_before = current.capacity(),
            capacity_after = candidate.capacity(),
            "Merged delta"
        );

        let revoked = candidate.count();
        slot.commit(candidate);
        slot.publish(srd.clone());

        info!(
            key = %key,
            log_id = %srd.log_id,
            revoked = revoked,
            timestamp = srd.digest.timestamp,
            "Published revocation digest"
        );

        Ok(srd)
    }
}
