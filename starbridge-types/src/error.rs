use thiserror::Error;

use crate::asset::AssetInfo;
use crate::chain::ChainId;

/// A well-formed envelope that this relay refuses to act on.
///
/// These are expected under version skew or misrouting and are distinct from
/// framing errors, which indicate corruption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported envelope version {version} (supported: {supported})")]
    UnsupportedVersion { version: u8, supported: u8 },

    #[error("chain mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },

    #[error("envelope carries no signatures")]
    NoSignatures,

    #[error("too many signatures: {count} (max {max})")]
    TooManySignatures { count: usize, max: usize },
}

/// Errors raised by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("chain not registered: {chain}")]
    UnknownChain { chain: ChainId },

    #[error("chain registered twice: {chain}")]
    DuplicateChain { chain: ChainId },

    #[error("no {chain} asset mapped for {asset}")]
    AssetNotFound { chain: ChainId, asset: AssetInfo },
}
