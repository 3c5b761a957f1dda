//! Hashing and witness key primitives for the Starbridge relay.

pub mod hash;
pub mod keys;
