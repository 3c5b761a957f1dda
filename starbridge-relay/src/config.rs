use std::net::SocketAddr;
use std::time::Duration;

use starbridge_types::constants::{DEFAULT_DIAL_TIMEOUT, DEFAULT_RELAY_PORT, MAX_RELAY_CONNECTIONS};

/// Configuration for a relay node.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
    /// Statically configured peer addresses (multiaddr strings).
    pub static_peers: Vec<String>,
    /// Whether to run mDNS discovery on the local segment.
    pub enable_mdns: bool,
    /// Maximum number of connected peers.
    pub max_connections: usize,
    /// Optional keypair seed (32 bytes). If None, generates random.
    pub keypair_seed: Option<[u8; 32]>,
    /// Per-peer timeout for the bootstrap dials.
    pub dial_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: ([0, 0, 0, 0], DEFAULT_RELAY_PORT).into(),
            static_peers: Vec::new(),
            enable_mdns: true,
            max_connections: MAX_RELAY_CONNECTIONS,
            keypair_seed: None,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.listen_addr.port(), DEFAULT_RELAY_PORT);
        assert!(config.enable_mdns);
        assert!(config.static_peers.is_empty());
    }
}
