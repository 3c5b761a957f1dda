use starbridge_types::chain::ChainId;
use starbridge_types::constants::{MAX_MESSAGE_SIZE, TOPIC_PREFIX};

/// Identify protocol version string.
pub const IDENTIFY_PROTOCOL: &str = "/starbridge/0.1.0";

/// Largest gossipsub frame accepted, leaving room for the gossipsub framing and
/// author signature around a maximum-size envelope.
pub const GOSSIP_MAX_TRANSMIT_SIZE: usize = MAX_MESSAGE_SIZE + 16 * 1024;

/// The message classes carried on the gossip bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageClass {
    /// Envelopes carrying witness signatures for a release on `ChainId`.
    SignedAggregated(ChainId),
}

impl MessageClass {
    /// Descriptor used in the topic name.
    pub fn descriptor(&self) -> String {
        match self {
            MessageClass::SignedAggregated(chain) => {
                format!("signed-aggregated-messages-{}", chain.as_str())
            }
        }
    }

    /// The topic this class is published on.
    pub fn topic(&self) -> String {
        topic_name(&self.descriptor())
    }
}

/// Build a topic name: `"{TOPIC_PREFIX}-{descriptor}"`.
///
/// Every node must derive the exact same string for a logical channel.
pub fn topic_name(descriptor: &str) -> String {
    format!("{}-{}", TOPIC_PREFIX, descriptor)
}

/// Topic for signed envelopes targeting `chain`.
pub fn signed_messages_topic(chain: ChainId) -> String {
    MessageClass::SignedAggregated(chain).topic()
}
