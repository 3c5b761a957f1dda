/// 32-byte BLAKE3 hash.
pub type Hash = [u8; 32];

/// Content hash of an envelope body. Used as the deduplication key.
pub type ContentHash = Hash;

/// A witness signature as carried on the wire. The signature scheme is owned by the
/// signing collaborator, so the relay treats it as opaque bytes.
pub type WitnessSignature = Vec<u8>;

/// Identifier of a deposit observed on the source chain.
pub type DepositId = Hash;

/// Amount in the asset's smallest unit.
pub type Amount = u128;

/// Lowercase hex rendering of a hash, for logs.
pub fn short_hex(hash: &Hash) -> String {
    hash[..8].iter().map(|b| format!("{:02x}", b)).collect()
}
