use borsh::{BorshDeserialize, BorshSerialize};

use crate::chain::ChainId;
use crate::constants::{ENVELOPE_VERSION, MAX_SIGNATURES};
use crate::error::ValidationError;
use crate::primitives::{ContentHash, WitnessSignature};

/// Content identity of a transaction body, shared by every envelope that carries it.
pub fn body_hash(body: &[u8]) -> ContentHash {
    *blake3::hash(body).as_bytes()
}

/// Versioned gossip envelope carrying a transaction body and the witness signatures
/// collected for it so far.
///
/// Fields are private: an envelope is immutable once built. Its content identity is
/// the hash of `body` alone, so re-broadcasts with more signatures collapse onto the
/// same pending item.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Envelope {
    version: u8,
    body: Vec<u8>,
    signatures: Vec<WitnessSignature>,
    chain: ChainId,
}

impl Envelope {
    /// Build an envelope at the current `ENVELOPE_VERSION`.
    pub fn new(chain: ChainId, body: Vec<u8>, signatures: Vec<WitnessSignature>) -> Self {
        Self::with_version(ENVELOPE_VERSION, chain, body, signatures)
    }

    /// Build an envelope with an explicit version tag.
    pub fn with_version(
        version: u8,
        chain: ChainId,
        body: Vec<u8>,
        signatures: Vec<WitnessSignature>,
    ) -> Self {
        Self {
            version,
            body,
            signatures,
            chain,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn signatures(&self) -> &[WitnessSignature] {
        &self.signatures
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    /// BLAKE3 hash of the body.
    pub fn content_hash(&self) -> ContentHash {
        body_hash(&self.body)
    }

    /// Reject envelopes whose version this relay does not speak.
    pub fn validate_version(&self) -> Result<(), ValidationError> {
        if self.version != ENVELOPE_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                version: self.version,
                supported: ENVELOPE_VERSION,
            });
        }
        Ok(())
    }

    /// Full semantic check for an envelope arriving at a collector for `expected`.
    ///
    /// Order matters: version first, then chain tag, then signature count.
    pub fn validate_for(&self, expected: ChainId) -> Result<(), ValidationError> {
        self.validate_version()?;
        if self.chain != expected {
            return Err(ValidationError::ChainMismatch {
                expected,
                actual: self.chain,
            });
        }
        if self.signatures.is_empty() {
            return Err(ValidationError::NoSignatures);
        }
        if self.signatures.len() > MAX_SIGNATURES {
            return Err(ValidationError::TooManySignatures {
                count: self.signatures.len(),
                max: MAX_SIGNATURES,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(chain: ChainId) -> Envelope {
        Envelope::new(chain, b"release 10 XLM".to_vec(), vec![vec![1u8; 64]])
    }

    #[test]
    fn test_new_uses_current_version() {
        assert_eq!(sample(ChainId::Stellar).version(), ENVELOPE_VERSION);
    }

    #[test]
    fn test_content_hash_ignores_signatures() {
        let a = Envelope::new(ChainId::Ethereum, b"body".to_vec(), vec![vec![1u8]]);
        let b = Envelope::new(
            ChainId::Ethereum,
            b"body".to_vec(),
            vec![vec![1u8], vec![2u8]],
        );
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_is_body_hash() {
        let env = sample(ChainId::Stellar);
        assert_eq!(env.content_hash(), body_hash(b"release 10 XLM"));
    }

    #[test]
    fn test_content_hash_differs_by_body() {
        let a = Envelope::new(ChainId::Ethereum, b"one".to_vec(), vec![vec![1u8]]);
        let b = Envelope::new(ChainId::Ethereum, b"two".to_vec(), vec![vec![1u8]]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_validate_version_rejects_unknown() {
        let env = Envelope::with_version(3, ChainId::Stellar, vec![1], vec![vec![1]]);
        assert_eq!(
            env.validate_version(),
            Err(ValidationError::UnsupportedVersion {
                version: 3,
                supported: ENVELOPE_VERSION,
            })
        );
    }

    #[test]
    fn test_validate_for_chain_mismatch() {
        let env = sample(ChainId::Stellar);
        assert_eq!(
            env.validate_for(ChainId::Ethereum),
            Err(ValidationError::ChainMismatch {
                expected: ChainId::Ethereum,
                actual: ChainId::Stellar,
            })
        );
        assert!(env.validate_for(ChainId::Stellar).is_ok());
    }

    #[test]
    fn test_validate_for_checks_version_before_chain() {
        let env = Envelope::with_version(1, ChainId::Stellar, vec![1], vec![vec![1]]);
        assert!(matches!(
            env.validate_for(ChainId::Ethereum),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_validate_for_no_signatures() {
        let env = Envelope::new(ChainId::Stellar, vec![1], vec![]);
        assert_eq!(
            env.validate_for(ChainId::Stellar),
            Err(ValidationError::NoSignatures)
        );
    }

    #[test]
    fn test_validate_for_too_many_signatures() {
        let sigs = (0..=MAX_SIGNATURES).map(|i| vec![i as u8]).collect();
        let env = Envelope::new(ChainId::Stellar, vec![1], sigs);
        assert!(matches!(
            env.validate_for(ChainId::Stellar),
            Err(ValidationError::TooManySignatures { .. })
        ));
    }
}
