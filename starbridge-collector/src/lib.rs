//! The per-chain collector: consumes signed envelopes from a gossip topic, merges
//! witness signatures per body, and hands each body to chain submission once it has
//! reached quorum.

pub mod collector;
pub mod error;
pub mod metrics;
pub mod pending;
pub mod submitter;
