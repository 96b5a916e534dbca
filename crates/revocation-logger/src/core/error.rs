//! Request-level failures of the logger
//!
//! Every variant is local to one request: it is reported to the caller and
//! leaves the logger running with its state untouched.

use revocation_core::RevocationError;
use thiserror::Error;

/// Error returned by the engine, publisher and relay
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggerError {
    #[error("Unknown CA: {0}")]
    UnknownEntity(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("No revocation digest has been published yet")]
    NotYetInitialized,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoggerError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            LoggerError::UnknownEntity(_) => "UNKNOWN_ENTITY",
            LoggerError::InvalidSignature(_) => "INVALID_SIGNATURE",
            LoggerError::InvalidEncoding(_) => "INVALID_ENCODING",
            LoggerError::ConsistencyViolation(_) => "CONSISTENCY_VIOLATION",
            LoggerError::NotYetInitialized => "NOT_YET_INITIALIZED",
            LoggerError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            LoggerError::MalformedRequest(_) => "MALFORMED_REQUEST",
            LoggerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Signature, hash and COSE faults mean the submission is not authentic;
/// codec and JSON faults mean it could not be read.
impl From<RevocationError> for LoggerError {
    fn from(err: RevocationError) -> Self {
        match err {
            RevocationError::SignatureInvalid(_)
            | RevocationError::CoseError(_)
            | RevocationError::CryptoError(_)
            | RevocationError::HashMismatch { .. } => LoggerError::InvalidSignature(err.to_string()),
            RevocationError::InvalidEncoding(_)
            | RevocationError::SerializationError(_)
            | RevocationError::UnexpectedPayload { .. }
            | RevocationError::UnsupportedVersion(_) => {
                LoggerError::InvalidEncoding(err.to_string())
            }
        }
    }
}
