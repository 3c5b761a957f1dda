use starbridge_types::chain::ChainId;
use starbridge_types::primitives::Hash;

/// Domain separation context for witness attestations.
pub const ATTESTATION_CONTEXT: &str = "starbridge 2024 witness attestation v0";

/// The digest a witness signs when attesting to `body` for `chain`.
///
/// Binding the chain tag keeps a signature for one destination from being replayed
/// on the other.
pub fn attestation_digest(chain: ChainId, body: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new_derive_key(ATTESTATION_CONTEXT);
    hasher.update(&[chain.tag()]);
    hasher.update(body);
    *hasher.finalize().as_bytes()
}
