//! Shared types for the Starbridge relay: the gossip envelope, chain identifiers,
//! the chain/asset registry and the operation variants carried in transaction bodies.

pub mod asset;
pub mod chain;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod primitives;
pub mod registry;
