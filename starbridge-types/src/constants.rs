use std::time::Duration;

// ─── Envelope Parameters ─────────────────────────────────────────────────────

/// The only envelope version this relay understands.
pub const ENVELOPE_VERSION: u8 = 0;

/// Maximum encoded envelope size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 1_048_576; // 1 MB

/// Maximum number of witness signatures a single envelope may carry.
pub const MAX_SIGNATURES: usize = 256;

// ─── Network Parameters ──────────────────────────────────────────────────────

/// Default port the relay listens on.
pub const DEFAULT_RELAY_PORT: u16 = 9745;

/// Maximum number of simultaneous peer connections.
pub const MAX_RELAY_CONNECTIONS: usize = 50;

/// Fixed prefix of every gossip topic name.
pub const TOPIC_PREFIX: &str = "starbridge";

/// How long a single static peer dial may take before it counts as failed.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of each per-topic delivery channel.
pub const TOPIC_CHANNEL_CAPACITY: usize = 1024;

// ─── Collector Parameters ────────────────────────────────────────────────────

/// Default number of distinct witness signatures required before forwarding.
pub const DEFAULT_QUORUM: usize = 2;

/// Default maximum number of bodies awaiting quorum per collector.
pub const DEFAULT_MAX_PENDING: usize = 10_000;
