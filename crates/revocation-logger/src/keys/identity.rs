//! The logger's own signing identity

use revocation_core::{
    KeyPair, PublicKey, Result, RevocationDigest, SignedRevocationDigest,
};
use tracing::info;

/// Log id and signing key, set once at start-up
#[derive(Debug, Clone)]
pub struct LoggerIdentity {
    key_pair: KeyPair,
}

impl LoggerIdentity {
    /// Wrap a key pair whose key id is the log id
    pub fn new(key_pair: KeyPair) -> Self {
        info!(log_id = %key_pair.kid(), "Logger identity loaded");
        Self { key_pair }
    }

    /// Generate an identity with a fresh random key
    pub fn generate(log_id: impl Into<String>) -> Self {
        Self::new(KeyPair::generate(log_id))
    }

    /// This log's id
    pub fn log_id(&self) -> &str {
        self.key_pair.kid()
    }

    /// Key monitors use to verify this log's attestations
    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key()
    }

    /// Sign an attestation over compressed merged state and delta
    pub fn issue(
        &self,
        digest: RevocationDigest,
        crv: Vec<u8>,
        crv_delta: Vec<u8>,
    ) -> Result<SignedRevocationDigest> {
        SignedRevocationDigest::issue(&self.key_pair, digest, crv, crv_delta)
    }
}
