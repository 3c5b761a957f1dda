use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Who issues an asset on its chain.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AssetIssuer {
    /// The chain's own native asset; it has no contract or issuer account.
    Native,
    /// Contract address (Ethereum) or issuing account (Stellar).
    Contract(String),
}

/// Identity of an asset on one chain.
///
/// Two values are the same asset only if code, issuer and decimals all match. Codes
/// alone collide across chains.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct AssetInfo {
    pub code: String,
    pub issuer: AssetIssuer,
    pub decimals: u8,
}

impl AssetInfo {
    /// A chain's native asset.
    pub fn native(code: &str, decimals: u8) -> Self {
        Self {
            code: code.to_string(),
            issuer: AssetIssuer::Native,
            decimals,
        }
    }

    /// An asset issued by a contract or account.
    pub fn contract(code: &str, address: &str, decimals: u8) -> Self {
        Self {
            code: code.to_string(),
            issuer: AssetIssuer::Contract(address.to_string()),
            decimals,
        }
    }

    pub fn is_native(&self) -> bool {
        self.issuer == AssetIssuer::Native
    }
}

impl std::fmt::Display for AssetInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.issuer {
            AssetIssuer::Native => write!(f, "{} (native, {} decimals)", self.code, self.decimals),
            AssetIssuer::Contract(addr) => {
                write!(f, "{}:{} ({} decimals)", self.code, addr, self.decimals)
            }
        }
    }
}
