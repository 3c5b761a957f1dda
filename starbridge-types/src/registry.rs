use std::collections::HashMap;

use crate::asset::AssetInfo;
use crate::chain::ChainId;
use crate::error::RegistryError;

/// Stellar account that issues the wrapped ETH asset.
pub const STELLAR_ETH_ISSUER: &str = "GDGXHBAY6JCPWGIWUHUQJNMWOIGJQN6CG7GNDZLQWAPDDG7J6R2YZEWG";

/// ERC-20 contract of wrapped XLM on Ethereum.
pub const ETHEREUM_WXLM_CONTRACT: &str = "0x9c2e3ad1cc7a3aae8e0c2c9a4a6d46ba54bb3ad4";

/// One supported chain: its native asset and how foreign assets map onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    id: ChainId,
    name: String,
    native_asset: AssetInfo,
    /// Foreign asset identity -> this chain's asset identity.
    asset_map: HashMap<AssetInfo, AssetInfo>,
}

impl Chain {
    pub fn new(id: ChainId, native_asset: AssetInfo) -> Self {
        Self {
            id,
            name: id.as_str().to_string(),
            native_asset,
            asset_map: HashMap::new(),
        }
    }

    /// Add a translation from a foreign asset to this chain's asset.
    pub fn with_mapping(mut self, foreign: AssetInfo, local: AssetInfo) -> Self {
        self.asset_map.insert(foreign, local);
        self
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native_asset(&self) -> &AssetInfo {
        &self.native_asset
    }

    /// Translate a foreign asset. Never falls back to a default.
    pub fn resolve(&self, foreign: &AssetInfo) -> Option<&AssetInfo> {
        self.asset_map.get(foreign)
    }
}

/// Read-only table of supported chains, built once at startup and shared behind an
/// `Arc`.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<ChainId, Chain>,
}

impl ChainRegistry {
    /// Build a registry from explicit chain entries. Each chain may appear once.
    pub fn new(chains: Vec<Chain>) -> Result<Self, RegistryError> {
        let mut map = HashMap::with_capacity(chains.len());
        for chain in chains {
            let id = chain.id();
            if map.insert(id, chain).is_some() {
                return Err(RegistryError::DuplicateChain { chain: id });
            }
        }
        Ok(Self { chains: map })
    }

    /// The compiled-in Stellar <-> Ethereum table.
    pub fn standard() -> Self {
        let xlm = AssetInfo::native("XLM", 7);
        let eth = AssetInfo::native("ETH", 18);

        let stellar = Chain::new(ChainId::Stellar, xlm.clone())
            .with_mapping(eth.clone(), AssetInfo::contract("ETH", STELLAR_ETH_ISSUER, 7));
        let ethereum = Chain::new(ChainId::Ethereum, eth).with_mapping(
            xlm,
            AssetInfo::contract("WXLM", ETHEREUM_WXLM_CONTRACT, 7),
        );

        let mut chains = HashMap::new();
        chains.insert(ChainId::Stellar, stellar);
        chains.insert(ChainId::Ethereum, ethereum);
        Self { chains }
    }

    /// Look up a chain entry.
    pub fn chain(&self, id: ChainId) -> Result<&Chain, RegistryError> {
        self.chains
            .get(&id)
            .ok_or(RegistryError::UnknownChain { chain: id })
    }

    /// Resolve `foreign` to the corresponding asset on `chain`.
    pub fn resolve(&self, chain: ChainId, foreign: &AssetInfo) -> Result<&AssetInfo, RegistryError> {
        self.chain(chain)?
            .resolve(foreign)
            .ok_or_else(|| RegistryError::AssetNotFound {
                chain,
                asset: foreign.clone(),
            })
    }

    /// Like `resolve`, but an asset that already is `chain`'s native asset resolves to
    /// itself.
    pub fn local_asset(&self, chain: ChainId, asset: &AssetInfo) -> Result<&AssetInfo, RegistryError> {
        let entry = self.chain(chain)?;
        if entry.native_asset() == asset {
            return Ok(entry.native_asset());
        }
        self.resolve(chain, asset)
    }

    /// Registered chain ids in tag order.
    pub fn chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self.chains.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_resolves_eth_on_stellar() {
        let registry = ChainRegistry::standard();
        let local = registry
            .resolve(ChainId::Stellar, &AssetInfo::native("ETH", 18))
            .unwrap();
        assert_eq!(local.code, "ETH");
        assert_eq!(local.decimals, 7);
        assert!(!local.is_native());
    }

    #[test]
    fn test_standard_resolves_xlm_on_ethereum() {
        let registry = ChainRegistry::standard();
        let local = registry
            .resolve(ChainId::Ethereum, &AssetInfo::native("XLM", 7))
            .unwrap();
        assert_eq!(
            *local,
            AssetInfo::contract("WXLM", ETHEREUM_WXLM_CONTRACT, 7)
        );
    }

    #[test]
    fn test_resolve_unknown_asset_is_error() {
        let registry = ChainRegistry::standard();
        let result = registry.resolve(ChainId::Stellar, &AssetInfo::native("BTC", 8));
        assert!(matches!(result, Err(RegistryError::AssetNotFound { .. })));
    }

    #[test]
    fn test_resolve_does_not_match_on_code_alone() {
        let registry = ChainRegistry::standard();
        // Same code as the mapped asset but a different issuer.
        let impostor = AssetInfo::contract("ETH", "0xfeed", 18);
        assert!(registry.resolve(ChainId::Stellar, &impostor).is_err());
    }

    #[test]
    fn test_local_asset_passes_native_through() {
        let registry = ChainRegistry::standard();
        let xlm = AssetInfo::native("XLM", 7);
        assert_eq!(registry.local_asset(ChainId::Stellar, &xlm).unwrap(), &xlm);
        assert_eq!(
            registry.local_asset(ChainId::Ethereum, &xlm).unwrap().code,
            "WXLM"
        );
    }

    #[test]
    fn test_native_assets() {
        let registry = ChainRegistry::standard();
        assert_eq!(
            registry.chain(ChainId::Stellar).unwrap().native_asset(),
            &AssetInfo::native("XLM", 7)
        );
        assert_eq!(registry.chain(ChainId::Ethereum).unwrap().name(), "ethereum");
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let a = Chain::new(ChainId::Stellar, AssetInfo::native("XLM", 7));
        let b = Chain::new(ChainId::Stellar, AssetInfo::native("XLM", 7));
        assert_eq!(
            ChainRegistry::new(vec![a, b]).unwrap_err(),
            RegistryError::DuplicateChain {
                chain: ChainId::Stellar
            }
        );
    }

    #[test]
    fn test_unknown_chain() {
        let registry =
            ChainRegistry::new(vec![Chain::new(ChainId::Stellar, AssetInfo::native("XLM", 7))])
                .unwrap();
        assert!(matches!(
            registry.chain(ChainId::Ethereum),
            Err(RegistryError::UnknownChain { .. })
        ));
        assert_eq!(registry.chain_ids(), vec![ChainId::Stellar]);
    }
}
