use starbridge_relay::error::RelayError;
use starbridge_types::error::RegistryError;
use thiserror::Error;

/// Errors that stop a collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The gossip subscription broke. Fatal to the collector loop.
    #[error("transport error: {0}")]
    Transport(#[from] RelayError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid collector config: {reason}")]
    ConfigError { reason: String },
}

/// Errors reported by a chain submission backend.
///
/// The collector logs these and never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("submission rejected: {reason}")]
    Rejected { reason: String },
}
