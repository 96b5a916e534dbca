//! Revocation Logger
//!
//! A Certificate-Transparency style log for certificate revocations. CAs
//! submit signed updates to their revocation vectors; the logger:
//! - Authenticates each update against the CA list
//! - Merges the update's delta into its own copy of the CA's vector
//! - Checks the CA's commitment hash against the merged state it derived
//! - Re-signs the merged state under its own key and publishes it
//!
//! ## Invariants
//!
//! 1. **Existence**: a bucket exists for a (CA, category) pair only once a
//!    submission for that pair has been verified
//! 2. **Monotonicity**: a bucket never shrinks and its bits are never cleared
//! 3. **Re-derivation**: an attestation is only published for state the
//!    logger computed and hash-checked itself
//! 4. **Atomicity**: a rejected submission leaves the bucket and its
//!    attestation byte-for-byte unchanged
//!
//! ## API Endpoints
//!
//! - `GET /` - Liveness check
//! - `POST /ct/v1/post-log-srd-with-rev-data` - Submit a CA revocation update
//! - `GET /ct/v1/get-log-srd-with-rev-data` - Fetch every current attestation
//! - `GET|POST /ct/v1/revoke-and-produce-srd` - Relay a revocation to a CA

pub mod api;
pub mod config;
pub mod core;
pub mod keys;
pub mod publisher;
pub mod relay;
pub mod storage;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::{ConfigError, LoadedConfig};
pub use core::{Engine, LoggerError};
pub use keys::{CaEntity, CaRegistry, LoggerIdentity, SelectionPolicy};
pub use publisher::{Publisher, DEFAULT_ACCEPTED_REVOCATION_TYPE};
pub use relay::{CaClient, CaRelay, HttpCaClient, RevokeRequest};
pub use storage::{BucketKey, BucketSlot, BucketStore, MemoryStore};
