//! Error types for revocation vectors, digests and envelopes

use thiserror::Error;

use crate::envelope::PayloadKind;

/// Result type alias using RevocationError
pub type Result<T> = std::result::Result<T, RevocationError>;

/// Errors that can occur while encoding, signing or verifying revocation data
#[derive(Error, Debug)]
pub enum RevocationError {
    /// Compressed CRV bytes could not be decoded
    #[error("Invalid CRV encoding: {0}")]
    InvalidEncoding(String),

    /// Signature did not verify against the expected key
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// A carried hash does not match the bytes it commits to
    #[error("Hash mismatch on {field}")]
    HashMismatch { field: &'static str },

    /// COSE encoding/decoding error
    #[error("COSE error: {0}")]
    CoseError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Cryptographic error
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// Envelope carried a different payload than the caller asked for
    #[error("Unexpected envelope payload: expected {expected}, got {actual}")]
    UnexpectedPayload {
        expected: PayloadKind,
        actual: PayloadKind,
    },

    /// Envelope version this build does not understand
    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(u16),
}

impl From<ed25519_dalek::SignatureError> for RevocationError {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        RevocationError::SignatureInvalid(err.to_string())
    }
}

impl From<serde_json::Error> for RevocationError {
    fn from(err: serde_json::Error) -> Self {
        RevocationError::SerializationError(err.to_string())
    }
}

impl From<coset::CoseError> for RevocationError {
    fn from(err: coset::CoseError) -> Self {
        RevocationError::CoseError(format!("{:?}", err))
    }
}
