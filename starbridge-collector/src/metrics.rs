use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use starbridge_types::chain::ChainId;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ChainLabels {
    pub chain: String,
}

/// Collector metrics for every chain, labelled by chain.
#[derive(Clone, Default)]
pub struct CollectorMetrics {
    received: Family<ChainLabels, Counter>,
    decode_failures: Family<ChainLabels, Counter>,
    validation_drops: Family<ChainLabels, Counter>,
    merged_signatures: Family<ChainLabels, Counter>,
    forwarded: Family<ChainLabels, Counter>,
    submit_failures: Family<ChainLabels, Counter>,
    pending: Family<ChainLabels, Gauge>,
}

impl CollectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register all collector metric families with `registry`.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "starbridge_collector_messages_received",
            "Gossip messages received on chain topics",
            self.received.clone(),
        );
        registry.register(
            "starbridge_collector_decode_failures",
            "Messages dropped because they failed to decode",
            self.decode_failures.clone(),
        );
        registry.register(
            "starbridge_collector_validation_drops",
            "Well-formed envelopes dropped by version, chain or signature checks",
            self.validation_drops.clone(),
        );
        registry.register(
            "starbridge_collector_merged_signatures",
            "New distinct signatures merged into pending bodies",
            self.merged_signatures.clone(),
        );
        registry.register(
            "starbridge_collector_forwarded",
            "Bodies handed to chain submission",
            self.forwarded.clone(),
        );
        registry.register(
            "starbridge_collector_submit_failures",
            "Submissions the chain backend reported as failed",
            self.submit_failures.clone(),
        );
        registry.register(
            "starbridge_collector_pending",
            "Bodies waiting for quorum",
            self.pending.clone(),
        );
    }

    /// Handles for one chain's series.
    pub fn for_chain(&self, chain: ChainId) -> ChainMetrics {
        let labels = ChainLabels {
            chain: chain.as_str().to_string(),
        };
        ChainMetrics {
            received: self.received.get_or_create(&labels).clone(),
            decode_failures: self.decode_failures.get_or_create(&labels).clone(),
            validation_drops: self.validation_drops.get_or_create(&labels).clone(),
            merged_signatures: self.merged_signatures.get_or_create(&labels).clone(),
            forwarded: self.forwarded.get_or_create(&labels).clone(),
            submit_failures: self.submit_failures.get_or_create(&labels).clone(),
            pending: self.pending.get_or_create(&labels).clone(),
        }
    }
}

/// The series a single collector updates. Clones share the underlying values.
#[derive(Clone, Default)]
pub struct ChainMetrics {
    pub received: Counter,
    pub decode_failures: Counter,
    pub validation_drops: Counter,
    pub merged_signatures: Counter,
    pub forwarded: Counter,
    pub submit_failures: Counter,
    pub pending: Gauge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_handles_share_family_values() {
        let metrics = CollectorMetrics::new();
        let stellar = metrics.for_chain(ChainId::Stellar);
        stellar.received.inc();
        stellar.received.inc();

        let again = metrics.for_chain(ChainId::Stellar);
        assert_eq!(again.received.get(), 2);
        assert_eq!(metrics.for_chain(ChainId::Ethereum).received.get(), 0);
    }

    #[test]
    fn test_encode_has_chain_label() {
        let metrics = CollectorMetrics::new();
        let mut registry = Registry::default();
        metrics.register(&mut registry);
        metrics.for_chain(ChainId::Ethereum).forwarded.inc();

        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &registry).unwrap();
        assert!(buf.contains("starbridge_collector_forwarded_total{chain=\"ethereum\"} 1"));
    }
}
