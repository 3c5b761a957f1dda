use libp2p::gossipsub;
use libp2p::identity::Keypair;
use libp2p::mdns;
use libp2p::swarm::behaviour::toggle::Toggle;
use libp2p::swarm::NetworkBehaviour;
use std::time::Duration;

use crate::protocol::{GOSSIP_MAX_TRANSMIT_SIZE, IDENTIFY_PROTOCOL};

/// Combined network behaviour for the Starbridge relay.
#[derive(NetworkBehaviour)]
pub struct StarbridgeBehaviour {
    /// Gossipsub: the topic-based bus envelopes travel on.
    pub gossipsub: gossipsub::Behaviour,
    /// mDNS local-network discovery. Disabled by config or when it fails to start.
    pub mdns: Toggle<mdns::tokio::Behaviour>,
    /// Identify protocol for peer identification.
    pub identify: libp2p::identify::Behaviour,
}

/// Build a StarbridgeBehaviour from a keypair.
///
/// Returns `Result<StarbridgeBehaviour, Box<dyn Error + Send + Sync>>` to conform
/// to the `TryIntoBehaviour` trait expected by `SwarmBuilder::with_behaviour`.
/// Only gossipsub failures are errors; mDNS failing to start is logged and leaves
/// discovery off.
pub fn build_behaviour(
    keypair: &Keypair,
    enable_mdns: bool,
) -> Result<StarbridgeBehaviour, Box<dyn std::error::Error + Send + Sync>> {
    // --- Gossipsub ---
    let message_id_fn = |message: &gossipsub::Message| {
        let hash = blake3::hash(&message.data);
        gossipsub::MessageId::from(hash.as_bytes().to_vec())
    };

    let gossipsub_config = gossipsub::ConfigBuilder::default()
        .heartbeat_interval(Duration::from_secs(1))
        .validation_mode(gossipsub::ValidationMode::Strict)
        .max_transmit_size(GOSSIP_MAX_TRANSMIT_SIZE)
        .message_id_fn(message_id_fn)
        .build()
        .map_err(|e| format!("gossipsub config: {}", e))?;

    let gossipsub = gossipsub::Behaviour::new(
        gossipsub::MessageAuthenticity::Signed(keypair.clone()),
        gossipsub_config,
    )
    .map_err(|e| format!("gossipsub behaviour: {}", e))?;

    // --- mDNS ---
    let mdns = if enable_mdns {
        match mdns::tokio::Behaviour::new(mdns::Config::default(), keypair.public().to_peer_id())
        {
            Ok(behaviour) => Some(behaviour),
            Err(e) => {
                tracing::warn!("mDNS unavailable, continuing without local discovery: {}", e);
                None
            }
        }
    } else {
        None
    };

    // --- Identify ---
    let identify = libp2p::identify::Behaviour::new(libp2p::identify::Config::new(
        IDENTIFY_PROTOCOL.to_string(),
        keypair.public(),
    ));

    Ok(StarbridgeBehaviour {
        gossipsub,
        mdns: Toggle::from(mdns),
        identify,
    })
}
