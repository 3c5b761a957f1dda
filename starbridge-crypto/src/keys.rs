use ed25519_dalek::{Signer, Verifier};
use starbridge_types::chain::ChainId;
use starbridge_types::primitives::WitnessSignature;
use thiserror::Error;

use crate::hash::attestation_digest;

/// 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid key material")]
    InvalidKeyMaterial,

    #[error("invalid signature length: {len} bytes (expected 64)")]
    InvalidSignatureLength { len: usize },

    #[error("signature verification failed")]
    BadSignature,
}

/// A witness's Ed25519 keypair.
pub struct Keypair {
    inner: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Get the public key bytes.
    pub fn public_key(&self) -> PublicKey {
        self.inner.verifying_key().to_bytes()
    }

    /// Get the 32-byte seed of this keypair.
    pub fn seed(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Sign a message, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.inner.sign(message).to_bytes()
    }

    /// Attest to `body` for `chain`, producing the bytes that go into an envelope's
    /// signature list.
    pub fn attest(&self, chain: ChainId, body: &[u8]) -> WitnessSignature {
        self.sign(&attestation_digest(chain, body)).to_vec()
    }
}

// SigningKey implements ZeroizeOnDrop with the "zeroize" feature.

/// Verify an Ed25519 signature.
pub fn verify(message: &[u8], signature: &[u8; 64], pubkey: &PublicKey) -> Result<(), KeyError> {
    let verifying_key =
        ed25519_dalek::VerifyingKey::from_bytes(pubkey).map_err(|_| KeyError::InvalidKeyMaterial)?;
    let sig = ed25519_dalek::Signature::from_bytes(signature);
    verifying_key
        .verify(message, &sig)
        .map_err(|_| KeyError::BadSignature)
}

/// Verify a witness attestation as carried in an envelope.
pub fn verify_attestation(
    chain: ChainId,
    body: &[u8],
    signature: &[u8],
    pubkey: &PublicKey,
) -> Result<(), KeyError> {
    let sig: [u8; 64] = signature
        .try_into()
        .map_err(|_| KeyError::InvalidSignatureLength {
            len: signature.len(),
        })?;
    verify(&attestation_digest(chain, body), &sig, pubkey)
}
