//! # Revocation Core
//!
//! Core types and cryptographic primitives for a Certificate-Transparency
//! style revocation log.
//!
//! ## Key Concepts
//!
//! - **CRV (Certificate Revocation Vector)**: bit-vector of revoked entries
//!   for one CA and revocation category
//! - **Delta**: newly revoked positions relative to a prior CRV
//! - **Revocation Digest**: signed claim binding a CRV state to a commitment
//!   hash over its compressed form
//! - **SRD (Signed Revocation Digest)**: a log's own attestation of the
//!   merged state, verifiable with the log's public key
//! - **Transport Envelope**: type-tagged wrapper used on the wire
//!
//! ## Invariants
//!
//! 1. **Monotonicity**: a CRV only grows and bits are never cleared
//! 2. **Commitment**: the hash a CA signs covers the compressed post-merge
//!    CRV, so any party can re-derive and check it
//! 3. **Attribution**: every signature names its signer, and verification
//!    fails under any other identity

pub mod crv;
pub mod crypto;
pub mod digest;
mod encoding;
pub mod envelope;
pub mod error;
pub mod hash;

pub use crv::{Crv, CrvCodec, RunLengthCodec};
pub use crypto::{KeyPair, PublicKey};
pub use digest::{RevocationDigest, RevocationSubmission, SignedRevocationDigest};
pub use envelope::{EnvelopePayload, PayloadKind, TransportEnvelope, ENVELOPE_VERSION};
pub use error::{Result, RevocationError};
pub use hash::HashAlgorithm;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}
