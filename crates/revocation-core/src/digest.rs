//! Revocation digests
//!
//! A [`RevocationDigest`] is the claim both CAs and logs sign: "as of
//! `timestamp`, the CRV for (`ca_id`, `revocation_type`) compresses to bytes
//! hashing to `crv_hash`, reached by applying a delta hashing to
//! `crv_delta_hash`".
//!
//! - A CA sends the claim with its compressed delta as a
//!   [`RevocationSubmission`].
//! - A log re-derives the merged CRV, checks the claim, and issues its own
//!   [`SignedRevocationDigest`] carrying the merged CRV and the delta.

use serde::{Deserialize, Serialize};

use crate::crv::{Crv, CrvCodec};
use crate::crypto::{KeyPair, PublicKey};
use crate::encoding::base64_bytes;
use crate::error::{Result, RevocationError};
use crate::hash::HashAlgorithm;

/// Signed claim about one CA's revocation vector for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationDigest {
    /// CA whose certificates the vector covers
    pub ca_id: String,

    /// Category tag partitioning the CA's revocation state
    pub revocation_type: String,

    /// Seconds since the Unix epoch, set by the CA
    pub timestamp: u64,

    /// Algorithm used for both hashes below
    pub hash_algorithm: HashAlgorithm,

    /// Commitment hash over the compressed post-merge CRV
    #[serde(with = "base64_bytes")]
    pub crv_hash: Vec<u8>,

    /// Hash over the compressed delta
    #[serde(with = "base64_bytes")]
    pub crv_delta_hash: Vec<u8>,
}

/// Bytes covered by a signature: the digest bound to the signer's id
#[derive(Serialize)]
struct SigningInput<'a> {
    signer_id: &'a str,
    digest: &'a RevocationDigest,
}

impl RevocationDigest {
    /// Build a digest over already-compressed CRV and delta bytes
    pub fn compute(
        ca_id: impl Into<String>,
        revocation_type: impl Into<String>,
        timestamp: u64,
        hash_algorithm: HashAlgorithm,
        crv: &[u8],
        crv_delta: &[u8],
    ) -> Self {
        Self {
            ca_id: ca_id.into(),
            revocation_type: revocation_type.into(),
            timestamp,
            hash_algorithm,
            crv_hash: hash_algorithm.digest(crv),
            crv_delta_hash: hash_algorithm.digest(crv_delta),
        }
    }

    /// Canonical bytes a signer with id `signer_id` signs
    pub fn signing_bytes(&self, signer_id: &str) -> Result<Vec<u8>> {
        serde_json::to_vec(&SigningInput {
            signer_id,
            digest: self,
        })
        .map_err(RevocationError::from)
    }

    fn check_hash(&self, field: &'static str, expected: &[u8], bytes: &[u8]) -> Result<()> {
        if self.hash_algorithm.digest(bytes) == expected {
            Ok(())
        } else {
            Err(RevocationError::HashMismatch { field })
        }
    }
}

// =============================================================================
// CA Submission
// =============================================================================

/// Revocation update as submitted by a CA
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationSubmission {
    /// The CA's claim
    pub digest: RevocationDigest,

    /// Compressed delta CRV
    #[serde(with = "base64_bytes")]
    pub crv_delta: Vec<u8>,

    /// CA signature over the claim (detached COSE_Sign1)
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

impl RevocationSubmission {
    /// Build and sign a submission on behalf of the CA holding `ca_key`
    ///
    /// `crv` is the state the CA expects after the delta is applied; its
    /// compressed hash becomes the commitment the log checks against.
    pub fn create(
        ca_key: &KeyPair,
        revocation_type: impl Into<String>,
        crv: &Crv,
        delta: &Crv,
        timestamp: u64,
        hash_algorithm: HashAlgorithm,
        codec: &dyn CrvCodec,
    ) -> Result<Self> {
        let compressed_crv = codec.compress(crv);
        let crv_delta = codec.compress(delta);
        let digest = RevocationDigest::compute(
            ca_key.kid(),
            revocation_type,
            timestamp,
            hash_algorithm,
            &compressed_crv,
            &crv_delta,
        );
        Self::sign(ca_key, digest, crv_delta)
    }

    /// Sign an existing digest with the CA key
    pub fn sign(ca_key: &KeyPair, digest: RevocationDigest, crv_delta: Vec<u8>) -> Result<Self> {
        let signature = ca_key.sign_detached(&digest.signing_bytes(ca_key.kid())?)?;
        Ok(Self {
            digest,
            crv_delta,
            signature,
        })
    }

    /// CA that made the claim
    pub fn ca_id(&self) -> &str {
        &self.digest.ca_id
    }

    /// Category the claim is about
    pub fn revocation_type(&self) -> &str {
        &self.digest.revocation_type
    }

    /// Verify the CA signature and that the carried delta is the one signed
    pub fn verify(&self, ca_key: &PublicKey) -> Result<()> {
        let payload = self.digest.signing_bytes(&self.digest.ca_id)?;
        ca_key.verify_detached(&payload, &self.signature)?;
        self.digest
            .check_hash("crv_delta", &self.digest.crv_delta_hash, &self.crv_delta)
    }
}

// =============================================================================
// Log Attestation
// =============================================================================

/// A log's attestation of the merged revocation state for one CA/category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRevocationDigest {
    /// Log that issued this attestation
    pub log_id: String,

    /// The log's claim over the merged state
    pub digest: RevocationDigest,

    /// Compressed merged CRV
    #[serde(with = "base64_bytes")]
    pub crv: Vec<u8>,

    /// Compressed delta that produced this state
    #[serde(with = "base64_bytes")]
    pub crv_delta: Vec<u8>,

    /// Log signature over the claim (detached COSE_Sign1)
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

impl SignedRevocationDigest {
    /// Issue an attestation signed with the log key
    ///
    /// The log id is the key's id.
    pub fn issue(
        log_key: &KeyPair,
        digest: RevocationDigest,
        crv: Vec<u8>,
        crv_delta: Vec<u8>,
    ) -> Result<Self> {
        let signature = log_key.sign_detached(&digest.signing_bytes(log_key.kid())?)?;
        Ok(Self {
            log_id: log_key.kid().to_string(),
            digest,
            crv,
            crv_delta,
            signature,
        })
    }

    /// Verify the log signature and that both carried vectors match their
    /// hashes
    pub fn verify(&self, log_key: &PublicKey) -> Result<()> {
        let payload = self.digest.signing_bytes(&self.log_id)?;
        log_key.verify_detached(&payload, &self.signature)?;
        self.digest
            .check_hash("crv", &self.digest.crv_hash, &self.crv)?;
        self.digest
            .check_hash("crv_delta", &self.digest.crv_delta_hash, &self.crv_delta)
    }

    /// Decode the merged CRV
    pub fn decode_crv(&self, codec: &dyn CrvCodec) -> Result<Crv> {
        codec.decompress(&self.crv)
    }

    /// Decode the delta that produced this state
    pub fn decode_delta(&self, codec: &dyn CrvCodec) -> Result<Crv> {
        codec.decompress(&self.crv_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crv::RunLengthCodec;

    fn submission(ca_key: &KeyPair, positions: &[u64]) -> RevocationSubmission {
        let crv = Crv::from_positions(positions);
        RevocationSubmission::create(
            ca_key,
            "Let's-Revoke",
            &crv,
            &crv,
            1_700_000_000,
            HashAlgorithm::Sha256,
            &RunLengthCodec,
        )
        .unwrap()
    }

    #[test]
    fn test_submission_verifies_under_ca_key() {
        let ca_key = KeyPair::generate("ca-x");
        let sub = submission(&ca_key, &[1, 3]);

        assert_eq!(sub.ca_id(), "ca-x");
        assert_eq!(sub.revocation_type(), "Let's-Revoke");
        sub.verify(&ca_key.public_key()).unwrap();
    }

    #[test]
    fn test_submission_with_swapped_delta_rejected() {
        let ca_key = KeyPair::generate("ca-x");
        let mut sub = submission(&ca_key, &[1, 3]);

        sub.crv_delta = RunLengthCodec.compress(&Crv::from_positions(&[1, 3, 5]));

        let err = sub.verify(&ca_key.public_key()).unwrap_err();
        assert!(matches!(err, RevocationError::HashMismatch { field: "crv_delta" }));
    }

    #[test]
    fn test_submission_with_edited_claim_rejected() {
        let ca_key = KeyPair::generate("ca-x");
        let mut sub = submission(&ca_key, &[1, 3]);

        sub.digest.timestamp += 1;

        assert!(sub.verify(&ca_key.public_key()).is_err());
    }

    #[test]
    fn test_submission_claiming_other_ca_rejected() {
        let ca_key = KeyPair::generate("ca-x");
        let mut sub = submission(&ca_key, &[1, 3]);
        sub.digest.ca_id = "ca-y".into();

        let other = PublicKey::from_bytes("ca-y", &ca_key.public_key().to_bytes()).unwrap();
        assert!(sub.verify(&other).is_err());
    }

    #[test]
    fn test_log_attestation_verifies_and_decodes() {
        let log_key = KeyPair::generate("log-1");
        let crv = Crv::from_positions(&[1, 3, 4, 5, 7]);
        let delta = Crv::from_positions(&[4, 5, 7]);
        let crv_bytes = RunLengthCodec.compress(&crv);
        let delta_bytes = RunLengthCodec.compress(&delta);

        let digest = RevocationDigest::compute(
            "ca-x",
            "Let's-Revoke",
            42,
            HashAlgorithm::Sha256,
            &crv_bytes,
            &delta_bytes,
        );
        let srd = SignedRevocationDigest::issue(&log_key, digest, crv_bytes, delta_bytes).unwrap();

        assert_eq!(srd.log_id, "log-1");
        srd.verify(&log_key.public_key()).unwrap();
        assert_eq!(srd.decode_crv(&RunLengthCodec).unwrap().to_string(), "10111010");
        assert_eq!(srd.decode_delta(&RunLengthCodec).unwrap(), delta);
    }

    #[test]
    fn test_log_attestation_with_swapped_crv_rejected() {
        let log_key = KeyPair::generate("log-1");
        let crv_bytes = RunLengthCodec.compress(&Crv::from_positions(&[1]));
        let digest = RevocationDigest::compute(
            "ca-x",
            "Let's-Revoke",
            42,
            HashAlgorithm::Sha256,
            &crv_bytes,
            &crv_bytes,
        );
        let mut srd =
            SignedRevocationDigest::issue(&log_key, digest, crv_bytes.clone(), crv_bytes).unwrap();

        srd.crv = RunLengthCodec.compress(&Crv::new(8));

        let err = srd.verify(&log_key.public_key()).unwrap_err();
        assert!(matches!(err, RevocationError::HashMismatch { field: "crv" }));
    }

    #[test]
    fn test_json_shape_uses_base64_fields() {
        let ca_key = KeyPair::generate("ca-x");
        let sub = submission(&ca_key, &[1, 3]);

        let value = serde_json::to_value(&sub).unwrap();
        assert!(value["crv_delta"].is_string());
        assert!(value["signature"].is_string());
        assert_eq!(value["digest"]["hash_algorithm"], "SHA256");

        let parsed: RevocationSubmission = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, sub);
    }
}
