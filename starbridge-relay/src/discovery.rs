use libp2p::{Multiaddr, PeerId};

/// Split a comma-separated peer list into multiaddr strings.
///
/// Empty entries are dropped; whitespace around entries is trimmed. Entries are not
/// validated here; `Discovery::new` skips malformed ones.
pub fn parse_peer_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Static peer addresses plus the filter applied to mDNS discoveries.
pub struct Discovery {
    static_peers: Vec<Multiaddr>,
}

impl Discovery {
    /// Create a new Discovery from a list of multiaddr strings.
    /// Invalid multiaddr strings are logged and skipped.
    pub fn new(static_peers: &[String]) -> Self {
        let addrs = static_peers
            .iter()
            .filter_map(|s| {
                s.parse::<Multiaddr>()
                    .map_err(|e| {
                        tracing::warn!("skipping invalid peer address '{}': {}", s, e);
                        e
                    })
                    .ok()
            })
            .collect();

        Self {
            static_peers: addrs,
        }
    }

    /// Return the parsed static peer addresses.
    pub fn static_addrs(&self) -> &[Multiaddr] {
        &self.static_peers
    }

    /// Whether an mDNS-discovered peer should be dialed.
    pub fn should_dial(local: &PeerId, discovered: &PeerId, already_connected: bool) -> bool {
        discovered != local && !already_connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer_list() {
        let peers = parse_peer_list(" /ip4/10.0.0.1/tcp/9745, ,/ip4/10.0.0.2/tcp/9745,");
        assert_eq!(
            peers,
            vec![
                "/ip4/10.0.0.1/tcp/9745".to_string(),
                "/ip4/10.0.0.2/tcp/9745".to_string()
            ]
        );
        assert!(parse_peer_list("").is_empty());
    }

    #[test]
    fn test_parse_valid_multiaddr() {
        let disc = Discovery::new(&["/ip4/127.0.0.1/tcp/9745".to_string()]);
        assert_eq!(disc.static_addrs().len(), 1);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let disc = Discovery::new(&[
            "not-a-multiaddr".to_string(),
            "/ip4/127.0.0.1/tcp/9745".to_string(),
            "/ip4/999.0.0.1/tcp/1".to_string(),
        ]);
        assert_eq!(disc.static_addrs().len(), 1);
    }

    #[test]
    fn test_should_dial() {
        let local = PeerId::random();
        let other = PeerId::random();
        assert!(!Discovery::should_dial(&local, &local, false));
        assert!(!Discovery::should_dial(&local, &other, true));
        assert!(Discovery::should_dial(&local, &other, false));
    }
}
