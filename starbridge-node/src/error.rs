use thiserror::Error;

/// Errors that can occur in the node.
#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum NodeError {
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    #[error("relay error: {0}")]
    RelayError(#[from] starbridge_relay::error::RelayError),

    #[error("collector error: {0}")]
    CollectorError(#[from] starbridge_collector::error::CollectorError),

    #[error("task error: {reason}")]
    TaskError { reason: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}
