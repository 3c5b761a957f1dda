//! P2P networking for the Starbridge relay.
//!
//! Built on libp2p: gossipsub carries signed envelopes on per-chain topics, mDNS
//! finds peers on the local segment, and statically configured peers are dialed at
//! bootstrap. The envelope wire codec lives here as well.

pub mod behaviour;
pub mod codec;
pub mod config;
pub mod discovery;
pub mod error;
pub mod peer_manager;
pub mod protocol;
pub mod relay;
