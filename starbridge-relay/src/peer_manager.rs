use libp2p::{Multiaddr, PeerId};
use std::collections::HashMap;

/// How a connection to a peer came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerOrigin {
    /// We dialed it from the static peer list (or an explicit dial).
    Static,
    /// We dialed it after mDNS found it.
    Discovered,
    /// It dialed us.
    Inbound,
}

impl PeerOrigin {
    pub const ALL: [PeerOrigin; 3] = [PeerOrigin::Static, PeerOrigin::Discovered, PeerOrigin::Inbound];

    /// Lowercase label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerOrigin::Static => "static",
            PeerOrigin::Discovered => "discovered",
            PeerOrigin::Inbound => "inbound",
        }
    }
}

/// Information about a connected peer.
pub struct PeerInfo {
    /// Remote address of the first connection.
    pub remote_addr: Multiaddr,
    pub origin: PeerOrigin,
    /// Agent string reported via identify.
    pub agent_version: Option<String>,
    /// When this peer connected.
    pub connected_at: std::time::Instant,
}

/// Connected peer counts, split by how each connection came about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerStatus {
    pub static_peers: usize,
    pub discovered: usize,
    pub inbound: usize,
}

impl PeerStatus {
    pub fn total(&self) -> usize {
        self.static_peers + self.discovered + self.inbound
    }

    pub fn count(&self, origin: PeerOrigin) -> usize {
        match origin {
            PeerOrigin::Static => self.static_peers,
            PeerOrigin::Discovered => self.discovered,
            PeerOrigin::Inbound => self.inbound,
        }
    }
}

/// Tracks connected peers. Nothing here outlives the process.
pub struct PeerManager {
    peers: HashMap<PeerId, PeerInfo>,
    max_connections: usize,
}

impl PeerManager {
    /// Create a new PeerManager with a maximum connection limit.
    pub fn new(max_connections: usize) -> Self {
        Self {
            peers: HashMap::new(),
            max_connections,
        }
    }

    /// Add a peer. Returns false if the connection limit is reached.
    /// Re-adding a known peer keeps the original entry.
    pub fn add_peer(&mut self, peer_id: PeerId, remote_addr: Multiaddr, origin: PeerOrigin) -> bool {
        if self.peers.contains_key(&peer_id) {
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.peers.insert(
            peer_id,
            PeerInfo {
                remote_addr,
                origin,
                agent_version: None,
                connected_at: std::time::Instant::now(),
            },
        );
        true
    }

    /// Remove a peer.
    pub fn remove_peer(&mut self, peer_id: &PeerId) -> Option<PeerInfo> {
        self.peers.remove(peer_id)
    }

    /// Record the agent string a peer reported via identify.
    pub fn set_agent_version(&mut self, peer_id: &PeerId, agent: String) {
        if let Some(info) = self.peers.get_mut(peer_id) {
            info.agent_version = Some(agent);
        }
    }

    pub fn peer(&self, peer_id: &PeerId) -> Option<&PeerInfo> {
        self.peers.get(peer_id)
    }

    /// Whether the peer manager has reached its connection limit.
    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.max_connections
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Iterator over the peer IDs of all connected peers.
    pub fn connected_peers(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.keys()
    }

    /// Number of connected peers with the given origin.
    pub fn count_by_origin(&self, origin: PeerOrigin) -> usize {
        self.peers.values().filter(|p| p.origin == origin).count()
    }

    pub fn status(&self) -> PeerStatus {
        PeerStatus {
            static_peers: self.count_by_origin(PeerOrigin::Static),
            discovered: self.count_by_origin(PeerOrigin::Discovered),
            inbound: self.count_by_origin(PeerOrigin::Inbound),
        }
    }
}
