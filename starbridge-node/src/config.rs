use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use starbridge_collector::collector::CollectorConfig;
use starbridge_crypto::keys::Keypair;
use starbridge_relay::config::RelayConfig;
use starbridge_types::chain::ChainId;
use starbridge_types::constants::{
    DEFAULT_DIAL_TIMEOUT, DEFAULT_MAX_PENDING, DEFAULT_QUORUM, DEFAULT_RELAY_PORT,
    MAX_RELAY_CONNECTIONS,
};

use crate::error::NodeError;

/// File name written by `init` and read by default.
pub const DEFAULT_CONFIG_FILE: &str = "starbridge.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub collector: CollectorSection,
    #[serde(default)]
    pub witness: WitnessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub listen_addr: String,
    /// Multiaddrs dialed at startup.
    #[serde(default)]
    pub static_peers: Vec<String>,
    #[serde(default = "default_enable_mdns")]
    pub enable_mdns: bool,
    pub max_connections: usize,
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,
    /// Hex-encoded 32-byte seed for a stable libp2p identity.
    #[serde(default)]
    pub keypair_seed: Option<String>,
}

fn default_enable_mdns() -> bool {
    true
}

fn default_dial_timeout_secs() -> u64 {
    DEFAULT_DIAL_TIMEOUT.as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorSection {
    /// Chains to run a collector for.
    pub chains: Vec<ChainId>,
    pub quorum: usize,
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_max_pending() -> usize {
    DEFAULT_MAX_PENDING
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WitnessConfig {
    /// Hex-encoded 32-byte seed of this node's witness signing key.
    pub keypair_seed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                listen_addr: format!("0.0.0.0:{}", DEFAULT_RELAY_PORT),
                static_peers: Vec::new(),
                enable_mdns: true,
                max_connections: MAX_RELAY_CONNECTIONS,
                dial_timeout_secs: default_dial_timeout_secs(),
                keypair_seed: None,
            },
            collector: CollectorSection {
                chains: ChainId::ALL.to_vec(),
                quorum: DEFAULT_QUORUM,
                max_pending: DEFAULT_MAX_PENDING,
            },
            witness: WitnessConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// Decode a hex-encoded 32-byte seed.
pub fn parse_seed(seed_hex: &str) -> Result<[u8; 32], NodeError> {
    let bytes = hex::decode(seed_hex.trim()).map_err(|e| NodeError::ConfigError {
        reason: format!("invalid keypair seed hex: {}", e),
    })?;
    bytes.try_into().map_err(|b: Vec<u8>| NodeError::ConfigError {
        reason: format!("keypair seed must be 32 bytes, got {}", b.len()),
    })
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path, e),
        })?;
        let config: NodeConfig = toml::from_str(&contents).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to parse config file '{}': {}", path, e),
        })?;
        Ok(config)
    }

    /// Initialize a default configuration file in the given directory.
    pub fn init(dir: &str) -> Result<(), NodeError> {
        let dir_path = Path::new(dir);
        if !dir_path.exists() {
            std::fs::create_dir_all(dir_path)?;
        }

        let config = NodeConfig::default();
        let toml_str = toml::to_string_pretty(&config).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to serialize default config: {}", e),
        })?;

        let config_path = dir_path.join(DEFAULT_CONFIG_FILE);
        std::fs::write(&config_path, toml_str)?;

        Ok(())
    }

    /// Check the values a running node depends on.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.collector.quorum == 0 {
            return Err(NodeError::ConfigError {
                reason: "collector.quorum must be at least 1".to_string(),
            });
        }
        if self.collector.max_pending == 0 {
            return Err(NodeError::ConfigError {
                reason: "collector.max_pending must be at least 1".to_string(),
            });
        }
        if self.collector.chains.is_empty() {
            return Err(NodeError::ConfigError {
                reason: "collector.chains must name at least one chain".to_string(),
            });
        }
        let mut chains = self.collector.chains.clone();
        chains.sort();
        chains.dedup();
        if chains.len() != self.collector.chains.len() {
            return Err(NodeError::ConfigError {
                reason: "collector.chains lists a chain more than once".to_string(),
            });
        }
        if self.network.max_connections == 0 {
            return Err(NodeError::ConfigError {
                reason: "network.max_connections must be at least 1".to_string(),
            });
        }
        self.listen_socket()?;
        if let Some(seed) = &self.network.keypair_seed {
            parse_seed(seed)?;
        }
        if let Some(seed) = &self.witness.keypair_seed {
            parse_seed(seed)?;
        }
        Ok(())
    }

    fn listen_socket(&self) -> Result<SocketAddr, NodeError> {
        self.network
            .listen_addr
            .parse()
            .map_err(|e| NodeError::ConfigError {
                reason: format!("invalid listen_addr '{}': {}", self.network.listen_addr, e),
            })
    }

    /// Build the relay configuration from the network section.
    pub fn relay_config(&self) -> Result<RelayConfig, NodeError> {
        let keypair_seed = match &self.network.keypair_seed {
            Some(seed) => Some(parse_seed(seed)?),
            None => None,
        };
        Ok(RelayConfig {
            listen_addr: self.listen_socket()?,
            static_peers: self.network.static_peers.clone(),
            enable_mdns: self.network.enable_mdns,
            max_connections: self.network.max_connections,
            keypair_seed,
            dial_timeout: Duration::from_secs(self.network.dial_timeout_secs),
        })
    }

    /// One collector configuration per configured chain.
    pub fn collector_configs(&self) -> Vec<CollectorConfig> {
        self.collector
            .chains
            .iter()
            .map(|&chain| CollectorConfig {
                chain,
                quorum: self.collector.quorum,
                max_pending: self.collector.max_pending,
            })
            .collect()
    }

    /// The witness signing key, if one is configured.
    pub fn witness_keypair(&self) -> Result<Option<Keypair>, NodeError> {
        match &self.witness.keypair_seed {
            Some(seed) => Ok(Some(Keypair::from_seed(&parse_seed(seed)?))),
            None => Ok(None),
        }
    }
}
