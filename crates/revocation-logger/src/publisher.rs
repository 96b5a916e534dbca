//! Aggregate view of published attestations for monitors

use revocation_core::TransportEnvelope;
use std::sync::Arc;
use tracing::debug;

use crate::core::LoggerError;
use crate::storage::BucketStore;

/// Category a logger republishes unless configured otherwise
pub const DEFAULT_ACCEPTED_REVOCATION_TYPE: &str = "Let's-Revoke";

/// Serves every current attestation for the accepted category
#[derive(Debug, Clone)]
pub struct Publisher {
    store: Arc<dyn BucketStore>,
    accepted_revocation_type: String,
}

impl Publisher {
    pub fn new(store: Arc<dyn BucketStore>, accepted_revocation_type: impl Into<String>) -> Self {
        Self {
            store,
            accepted_revocation_type: accepted_revocation_type.into(),
        }
    }

    pub fn accepted_revocation_type(&self) -> &str {
        &self.accepted_revocation_type
    }

    /// Envelopes for every attestation in the accepted category, in key order
    ///
    /// Each attestation is read under its bucket's lock, so it reflects either
    /// the state before or after a concurrent merge, never a mix.
    pub fn snapshot(&self) -> Result<Vec<TransportEnvelope>, LoggerError> {
        let envelopes: Vec<TransportEnvelope> = self
            .store
            .published()
            .into_iter()
            .filter(|(key, _)| key.revocation_type == self.accepted_revocation_type)
            .map(|(_, srd)| TransportEnvelope::wrap(srd))
            .collect();

        if envelopes.is_empty() {
            return Err(LoggerError::NotYetInitialized);
        }

        debug!(count = envelopes.len(), "Serving published revocation digests");
        Ok(envelopes)
    }
}
