//! Transport envelope
//!
//! The wire wrapper used to ship revocation payloads between CAs, logs and
//! monitors. The payload kind is an explicit tag; decoding an envelope with
//! an unknown tag fails instead of yielding an opaque blob.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::digest::{RevocationSubmission, SignedRevocationDigest};
use crate::error::{Result, RevocationError};

/// Envelope format version this build produces and accepts
pub const ENVELOPE_VERSION: u16 = 1;

/// Registry of payload kinds an envelope may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    SignedRevocationDigest,
    RevocationSubmission,
}

impl PayloadKind {
    /// Every kind known to this build
    pub const ALL: [PayloadKind; 2] = [
        PayloadKind::SignedRevocationDigest,
        PayloadKind::RevocationSubmission,
    ];

    /// Tag written into the envelope's `type_id`
    pub fn type_id(self) -> &'static str {
        match self {
            PayloadKind::SignedRevocationDigest => "SRD",
            PayloadKind::RevocationSubmission => "REVOCATION_SUBMISSION",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_id())
    }
}

/// Envelope payload, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type_id", content = "body")]
pub enum EnvelopePayload {
    #[serde(rename = "SRD")]
    SignedRevocationDigest(SignedRevocationDigest),
    #[serde(rename = "REVOCATION_SUBMISSION")]
    RevocationSubmission(RevocationSubmission),
}

impl EnvelopePayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            EnvelopePayload::SignedRevocationDigest(_) => PayloadKind::SignedRevocationDigest,
            EnvelopePayload::RevocationSubmission(_) => PayloadKind::RevocationSubmission,
        }
    }
}

impl From<SignedRevocationDigest> for EnvelopePayload {
    fn from(srd: SignedRevocationDigest) -> Self {
        EnvelopePayload::SignedRevocationDigest(srd)
    }
}

impl From<RevocationSubmission> for EnvelopePayload {
    fn from(submission: RevocationSubmission) -> Self {
        EnvelopePayload::RevocationSubmission(submission)
    }
}

/// Versioned, timestamped wrapper around one payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportEnvelope {
    /// Envelope format version
    pub version: u16,

    /// When the envelope was built, seconds since the Unix epoch
    pub timestamp: u64,

    /// The wrapped payload
    pub payload: EnvelopePayload,
}

impl TransportEnvelope {
    /// Wrap a payload, stamping it with the current time
    pub fn wrap(payload: impl Into<EnvelopePayload>) -> Self {
        let timestamp = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        Self {
            version: ENVELOPE_VERSION,
            timestamp,
            payload: payload.into(),
        }
    }

    /// Kind of the wrapped payload
    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    /// Decode an envelope from JSON bytes, rejecting unknown versions
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Self = serde_json::from_slice(bytes)?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(RevocationError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }

    /// Encode the envelope as JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(RevocationError::from)
    }

    /// Unwrap a signed revocation digest
    pub fn into_signed_digest(self) -> Result<SignedRevocationDigest> {
        match self.payload {
            EnvelopePayload::SignedRevocationDigest(srd) => Ok(srd),
            other => Err(RevocationError::UnexpectedPayload {
                expected: PayloadKind::SignedRevocationDigest,
                actual: other.kind(),
            }),
        }
    }

    /// Unwrap a CA submission
    pub fn into_submission(self) -> Result<RevocationSubmission> {
        match self.payload {
            EnvelopePayload::RevocationSubmission(submission) => Ok(submission),
            other => Err(RevocationError::UnexpectedPayload {
                expected: PayloadKind::RevocationSubmission,
                actual: other.kind(),
            }),
        }
    }
}
