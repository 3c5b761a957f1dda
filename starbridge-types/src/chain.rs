use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Destination chain an envelope targets. The discriminant is the wire tag.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[borsh(use_discriminant = true)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ChainId {
    Stellar = 0,
    Ethereum = 1,
}

impl ChainId {
    /// Every supported chain, in tag order.
    pub const ALL: [ChainId; 2] = [ChainId::Stellar, ChainId::Ethereum];

    /// The wire tag.
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Short lowercase identifier (for CLI/config and topic names).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainId::Stellar => "stellar",
            ChainId::Ethereum => "ethereum",
        }
    }

    /// Parse from a string identifier.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stellar" => Some(ChainId::Stellar),
            "ethereum" => Some(ChainId::Ethereum),
            _ => None,
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ChainId::Stellar => "Stellar",
            ChainId::Ethereum => "Ethereum",
        }
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tags() {
        assert_eq!(ChainId::Stellar.tag(), 0);
        assert_eq!(ChainId::Ethereum.tag(), 1);
        assert_eq!(borsh::to_vec(&ChainId::Ethereum).unwrap(), vec![1u8]);
    }

    #[test]
    fn test_unknown_tag_fails_borsh() {
        assert!(ChainId::try_from_slice(&[7u8]).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(ChainId::parse("Stellar"), Some(ChainId::Stellar));
        assert_eq!(ChainId::parse(" ethereum "), Some(ChainId::Ethereum));
        assert_eq!(ChainId::parse("bitcoin"), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ChainId::Ethereum).unwrap();
        assert_eq!(json, "\"ethereum\"");
    }
}
