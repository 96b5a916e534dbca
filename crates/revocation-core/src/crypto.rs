//! Signing primitives for revocation digests
//!
//! CAs and logs sign revocation digests with Ed25519. Signatures are carried
//! as COSE_Sign1 structures with a detached payload: the digest travels in
//! plain JSON next to the signature, and the protected header names the
//! signer's id so a verifier can refuse a signature made under another
//! identity.
//!
//! Key types:
//! - `KeyPair`: Ed25519 key pair for signing
//! - `PublicKey`: Ed25519 public key for verification

use crate::error::{Result, RevocationError};
use base64::{engine::general_purpose::STANDARD, Engine};
use coset::{iana, CborSerializable, CoseSign1, CoseSign1Builder, HeaderBuilder};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// COSE algorithm identifier for EdDSA (Ed25519)
const EDDSA_ALG: iana::Algorithm = iana::Algorithm::EdDSA;

/// Ed25519 key pair for signing revocation digests
#[derive(Clone)]
pub struct KeyPair {
    /// Key identifier (the CA id or log id this key signs for)
    kid: String,
    /// Ed25519 signing key (private)
    signing_key: SigningKey,
    /// Ed25519 verifying key (public)
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("kid", &self.kid)
            .field("verifying_key", &"[redacted]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate(kid: impl Into<String>) -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(kid, signing_key)
    }

    /// Create a key pair from an existing signing key
    pub fn from_signing_key(kid: impl Into<String>, signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            kid: kid.into(),
            signing_key,
            verifying_key,
        }
    }

    /// Create a key pair from a raw 32-byte seed
    pub fn from_bytes(kid: impl Into<String>, bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(kid, SigningKey::from_bytes(bytes))
    }

    /// Create a key pair from a base64-encoded 32-byte seed
    pub fn from_base64(kid: impl Into<String>, encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| RevocationError::CryptoError(e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            RevocationError::CryptoError("Invalid private key length, expected 32".into())
        })?;
        Ok(Self::from_bytes(kid, &bytes))
    }

    /// Get the key identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            kid: self.kid.clone(),
            verifying_key: self.verifying_key,
        }
    }

    /// Get the raw signing key bytes
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign `payload` and return a CBOR-encoded COSE_Sign1 with the payload
    /// detached
    pub fn sign_detached(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let protected = HeaderBuilder::new()
            .algorithm(EDDSA_ALG)
            .key_id(self.kid.as_bytes().to_vec())
            .build();

        let cose = CoseSign1Builder::new()
            .protected(protected)
            .try_create_detached_signature(payload, &[], |data| {
                let signature = self.signing_key.sign(data);
                Ok::<_, RevocationError>(signature.to_bytes().to_vec())
            })?
            .build();

        cose.to_vec().map_err(RevocationError::from)
    }
}

/// Ed25519 public key for verification
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Key identifier
    kid: String,
    /// Ed25519 verifying key
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey").field("kid", &self.kid).finish()
    }
}

impl PublicKey {
    /// Create a public key from raw bytes
    pub fn from_bytes(kid: impl Into<String>, bytes: &[u8; 32]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| RevocationError::CryptoError(e.to_string()))?;
        Ok(Self {
            kid: kid.into(),
            verifying_key,
        })
    }

    /// Create a public key from base64-encoded bytes
    pub fn from_base64(kid: impl Into<String>, encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| RevocationError::CryptoError(e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            RevocationError::CryptoError("Invalid public key length, expected 32".into())
        })?;
        Self::from_bytes(kid, &bytes)
    }

    /// Get the key identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Get the raw verifying key bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Base64 form used in CA and log lists
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Verify a detached COSE_Sign1 signature over `payload`
    pub fn verify_detached(&self, payload: &[u8], signature: &[u8]) -> Result<()> {
        let cose = CoseSign1::from_slice(signature)?;

        if cose.payload.is_some() {
            return Err(RevocationError::SignatureInvalid(
                "Expected a detached payload".into(),
            ));
        }

        if cose.protected.header.alg != Some(coset::Algorithm::Assigned(EDDSA_ALG)) {
            return Err(RevocationError::SignatureInvalid(
                "Unsupported signature algorithm".into(),
            ));
        }

        // The signer must name the identity this key belongs to
        let kid = String::from_utf8_lossy(&cose.protected.header.key_id);
        if kid != self.kid {
            return Err(RevocationError::SignatureInvalid(format!(
                "Key ID mismatch: expected '{}', got '{}'",
                self.kid, kid
            )));
        }

        let sig_structure = cose.tbs_detached_data(payload, &[]);

        let signature_bytes: [u8; 64] = cose
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| RevocationError::SignatureInvalid("Invalid signature length".into()))?;
        let signature = Signature::from_bytes(&signature_bytes);

        self.verifying_key
            .verify(&sig_structure, &signature)
            .map_err(RevocationError::from)
    }
}

/// Read the signer id out of a detached signature without verifying it
pub fn signer_kid(signature: &[u8]) -> Option<String> {
    let cose = CoseSign1::from_slice(signature).ok()?;
    let kid = &cose.protected.header.key_id;
    if kid.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(kid).to_string())
    }
}
