use thiserror::Error;

/// Errors that can occur in the relay layer.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A general network-level error, such as host construction failing.
    #[error("network error: {reason}")]
    NetworkError { reason: String },

    /// Failed to encode a message.
    #[error("codec error: {reason}")]
    CodecError { reason: String },

    /// Failed to establish a connection.
    #[error("connection error: {reason}")]
    ConnectionError { reason: String },

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Joining a gossip topic failed.
    #[error("protocol error: {reason}")]
    ProtocolError { reason: String },

    /// Publishing to a gossip topic failed.
    #[error("publish to {topic} failed: {reason}")]
    PublishError { topic: String, reason: String },

    /// The topic subscription ended because the network task stopped.
    #[error("subscription to {topic} closed")]
    SubscriptionClosed { topic: String },

    /// The network task is gone or did not reply.
    #[error("channel error: {reason}")]
    ChannelError { reason: String },
}

/// Framing errors raised while decoding an envelope from wire bytes.
///
/// These point at transport corruption or a hostile peer; an envelope that decodes
/// but carries an unsupported version is a `ValidationError` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("data too short for length prefix: {len} bytes")]
    TooShort { len: usize },

    #[error("declared length {size} exceeds max {max}")]
    TooLarge { size: usize, max: usize },

    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("{extra} trailing bytes after frame")]
    TrailingBytes { extra: usize },

    #[error("malformed envelope: {reason}")]
    Malformed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_closed_display() {
        let err = RelayError::SubscriptionClosed {
            topic: "starbridge-x".to_string(),
        };
        assert_eq!(err.to_string(), "subscription to starbridge-x closed");
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::Truncated {
            expected: 10,
            actual: 4,
        };
        assert!(err.to_string().contains("expected 10"));
    }
}
