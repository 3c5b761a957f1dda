use std::sync::Arc;

use starbridge_relay::codec::decode_envelope;
use starbridge_relay::error::DecodeError;
use starbridge_relay::protocol::signed_messages_topic;
use starbridge_relay::relay::{RelayHandle, Subscription};
use starbridge_types::chain::ChainId;
use starbridge_types::constants::{DEFAULT_MAX_PENDING, DEFAULT_QUORUM};
use starbridge_types::error::ValidationError;
use starbridge_types::primitives::short_hex;
use starbridge_types::registry::ChainRegistry;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::CollectorError;
use crate::metrics::ChainMetrics;
use crate::pending::{Merge, PendingTable};
use crate::submitter::Submitter;

/// Where a collector is in its lifecycle.
///
/// `Receiving` through `Forwarding` are transient per message; between messages the
/// collector sits in `Subscribed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Joining,
    Subscribed,
    Receiving,
    Decoding,
    Validating,
    Deduping,
    Forwarding,
    Stopped,
}

/// What happened to a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Framing error; dropped.
    DecodeFailed(DecodeError),
    /// Decoded but refused; dropped.
    Rejected(ValidationError),
    /// Body already forwarded; ignored.
    AlreadyForwarded,
    /// Merged; still below quorum.
    Pending { signatures: usize, quorum: usize },
    /// Reached quorum and was handed to the submitter.
    Forwarded { signatures: usize },
    /// Reached quorum, handed over, and the submitter failed. Not retried.
    SubmitFailed { reason: String },
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub chain: ChainId,
    /// Distinct signatures required before a body is forwarded.
    pub quorum: usize,
    /// Bodies held below quorum before the oldest is evicted.
    pub max_pending: usize,
}

impl CollectorConfig {
    pub fn new(chain: ChainId) -> Self {
        Self {
            chain,
            quorum: DEFAULT_QUORUM,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }

    pub fn with_quorum(mut self, quorum: usize) -> Self {
        self.quorum = quorum;
        self
    }
}

/// Consumes one chain's signed-messages topic.
///
/// A collector is a single sequential consumer and owns its pending table; run one per
/// chain.
pub struct Collector {
    config: CollectorConfig,
    topic: String,
    table: PendingTable,
    submitter: Arc<dyn Submitter>,
    metrics: ChainMetrics,
    state: CollectorState,
}

impl Collector {
    pub fn new(
        config: CollectorConfig,
        registry: &ChainRegistry,
        submitter: Arc<dyn Submitter>,
        metrics: ChainMetrics,
    ) -> Result<Self, CollectorError> {
        if config.quorum == 0 {
            return Err(CollectorError::ConfigError {
                reason: "quorum must be at least 1".to_string(),
            });
        }
        if config.max_pending == 0 {
            return Err(CollectorError::ConfigError {
                reason: "max_pending must be at least 1".to_string(),
            });
        }
        registry.chain(config.chain)?;

        Ok(Self {
            topic: signed_messages_topic(config.chain),
            table: PendingTable::new(config.max_pending, config.quorum),
            config,
            submitter,
            metrics,
            state: CollectorState::Joining,
        })
    }

    pub fn chain(&self) -> ChainId {
        self.config.chain
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn pending_count(&self) -> usize {
        self.table.pending_len()
    }

    /// Join this chain's topic on the relay.
    pub async fn subscribe(&mut self, relay: &RelayHandle) -> Result<Subscription, CollectorError> {
        self.state = CollectorState::Joining;
        match relay.subscribe(&self.topic).await {
            Ok(subscription) => {
                self.state = CollectorState::Subscribed;
                info!(chain = %self.config.chain, topic = %self.topic, "collector subscribed");
                Ok(subscription)
            }
            Err(e) => {
                self.state = CollectorState::Stopped;
                Err(e.into())
            }
        }
    }

    /// Process messages until `shutdown` flips to true (returns `Ok`) or the
    /// subscription breaks (returns `Transport`).
    pub async fn run(
        &mut self,
        mut subscription: Subscription,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), CollectorError> {
        self.state = CollectorState::Subscribed;
        info!(
            chain = %self.config.chain,
            topic = %subscription.topic(),
            quorum = self.config.quorum,
            "collector running"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender also means stop.
                    if changed.is_err() {
                        break;
                    }
                }
                received = subscription.next() => match received {
                    Ok(message) => {
                        self.state = CollectorState::Receiving;
                        self.handle_message(&message.data).await;
                    }
                    Err(e) => {
                        error!(chain = %self.config.chain, "collector subscription failed: {}", e);
                        self.state = CollectorState::Stopped;
                        return Err(CollectorError::Transport(e));
                    }
                },
            }
        }

        info!(
            chain = %self.config.chain,
            pending = self.table.pending_len(),
            forwarded = self.table.forwarded_len(),
            "collector stopped"
        );
        self.state = CollectorState::Stopped;
        Ok(())
    }

    /// Decode, validate, merge and possibly forward one raw message.
    pub async fn handle_message(&mut self, data: &[u8]) -> MessageOutcome {
        self.metrics.received.inc();
        let outcome = self.process(data).await;
        if self.state != CollectorState::Stopped {
            self.state = CollectorState::Subscribed;
        }
        outcome
    }

    async fn process(&mut self, data: &[u8]) -> MessageOutcome {
        let chain = self.config.chain;

        self.state = CollectorState::Decoding;
        let envelope = match decode_envelope(data) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(%chain, bytes = data.len(), "dropping undecodable message: {}", e);
                self.metrics.decode_failures.inc();
                return MessageOutcome::DecodeFailed(e);
            }
        };

        self.state = CollectorState::Validating;
        if let Err(e) = envelope.validate_for(chain) {
            debug!(%chain, "dropping envelope: {}", e);
            self.metrics.validation_drops.inc();
            return MessageOutcome::Rejected(e);
        }

        self.state = CollectorState::Deduping;
        let hash = envelope.content_hash();
        let quorum = self.config.quorum;
        let entry = match self.table.merge(hash, envelope.body(), envelope.signatures()) {
            Merge::AlreadyForwarded => {
                debug!(%chain, hash = %short_hex(&hash), "body already forwarded, ignoring");
                return MessageOutcome::AlreadyForwarded;
            }
            Merge::Pending {
                added,
                total,
                evicted,
            } => {
                if let Some(old) = evicted {
                    warn!(%chain, evicted = %short_hex(&old), "pending table full, evicted oldest body");
                }
                self.metrics.merged_signatures.inc_by(added as u64);
                self.metrics.pending.set(self.table.pending_len() as i64);
                debug!(
                    %chain,
                    hash = %short_hex(&hash),
                    signatures = total,
                    quorum,
                    "body pending"
                );
                return MessageOutcome::Pending {
                    signatures: total,
                    quorum,
                };
            }
            Merge::Ready { added, entry } => {
                self.metrics.merged_signatures.inc_by(added as u64);
                entry
            }
        };

        self.state = CollectorState::Forwarding;
        self.metrics.pending.set(self.table.pending_len() as i64);
        self.metrics.forwarded.inc();

        let signatures = entry.signatures.len();
        info!(
            %chain,
            hash = %short_hex(&hash),
            signatures,
            "quorum reached, forwarding"
        );

        match self
            .submitter
            .submit(chain, &entry.body, &entry.signatures)
            .await
        {
            Ok(receipt) => {
                info!(
                    %chain,
                    hash = %short_hex(&hash),
                    reference = %receipt.reference,
                    "submission accepted"
                );
                MessageOutcome::Forwarded { signatures }
            }
            Err(e) => {
                error!(%chain, hash = %short_hex(&hash), "submission failed, not retrying: {}", e);
                self.metrics.submit_failures.inc();
                MessageOutcome::SubmitFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submitter::RecordingSubmitter;
    use starbridge_relay::codec::encode_envelope;
    use starbridge_types::constants::MAX_SIGNATURES;
    use starbridge_types::envelope::Envelope;
    use starbridge_types::registry::Chain;
    use starbridge_types::asset::AssetInfo;

    fn collector(chain: ChainId, quorum: usize) -> (Collector, Arc<RecordingSubmitter>) {
        let submitter = Arc::new(RecordingSubmitter::new());
        let collector = Collector::new(
            CollectorConfig::new(chain).with_quorum(quorum),
            &ChainRegistry::standard(),
            submitter.clone(),
            ChainMetrics::default(),
        )
        .unwrap();
        (collector, submitter)
    }

    fn wire(chain: ChainId, body: &[u8], sigs: &[&[u8]]) -> Vec<u8> {
        let envelope = Envelope::new(chain, body.to_vec(), sigs.iter().map(|s| s.to_vec()).collect());
        encode_envelope(&envelope).unwrap()
    }

    #[test]
    fn test_new_rejects_zero_quorum() {
        let result = Collector::new(
            CollectorConfig::new(ChainId::Stellar).with_quorum(0),
            &ChainRegistry::standard(),
            Arc::new(RecordingSubmitter::new()),
            ChainMetrics::default(),
        );
        assert!(matches!(result, Err(CollectorError::ConfigError { .. })));
    }

    #[test]
    fn test_new_rejects_unregistered_chain() {
        let registry =
            ChainRegistry::new(vec![Chain::new(ChainId::Stellar, AssetInfo::native("XLM", 7))])
                .unwrap();
        let result = Collector::new(
            CollectorConfig::new(ChainId::Ethereum),
            &registry,
            Arc::new(RecordingSubmitter::new()),
            ChainMetrics::default(),
        );
        assert!(matches!(result, Err(CollectorError::Registry(_))));
    }

    #[test]
    fn test_topic_and_initial_state() {
        let (collector, _) = collector(ChainId::Ethereum, 2);
        assert_eq!(
            collector.topic(),
            "starbridge-signed-aggregated-messages-ethereum"
        );
        assert_eq!(collector.state(), CollectorState::Joining);
    }

    #[tokio::test]
    async fn test_garbage_is_dropped_and_counted() {
        let (mut collector, submitter) = collector(ChainId::Stellar, 1);
        let outcome = collector.handle_message(&[0, 0, 0, 9, 1]).await;
        assert!(matches!(outcome, MessageOutcome::DecodeFailed(_)));
        assert_eq!(collector.metrics.decode_failures.get(), 1);
        assert_eq!(collector.state(), CollectorState::Subscribed);
        assert_eq!(submitter.count(), 0);
    }

    #[tokio::test]
    async fn test_signature_count_limits() {
        let (mut collector, _) = collector(ChainId::Stellar, 1);
        let outcome = collector.handle_message(&wire(ChainId::Stellar, b"b", &[])).await;
        assert_eq!(outcome, MessageOutcome::Rejected(ValidationError::NoSignatures));

        let sigs: Vec<Vec<u8>> = (0..=MAX_SIGNATURES).map(|i| (i as u32).to_be_bytes().to_vec()).collect();
        let envelope = Envelope::new(ChainId::Stellar, b"b".to_vec(), sigs);
        let outcome = collector
            .handle_message(&encode_envelope(&envelope).unwrap())
            .await;
        assert!(matches!(
            outcome,
            MessageOutcome::Rejected(ValidationError::TooManySignatures { .. })
        ));
        assert_eq!(collector.metrics.validation_drops.get(), 2);
    }

    #[tokio::test]
    async fn test_full_table_keeps_pending_body_when_complete_body_arrives() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let mut config = CollectorConfig::new(ChainId::Stellar).with_quorum(2);
        config.max_pending = 1;
        let mut collector = Collector::new(
            config,
            &ChainRegistry::standard(),
            submitter.clone(),
            ChainMetrics::default(),
        )
        .unwrap();

        let outcome = collector
            .handle_message(&wire(ChainId::Stellar, b"older", &[b"a"]))
            .await;
        assert_eq!(outcome, MessageOutcome::Pending { signatures: 1, quorum: 2 });

        let outcome = collector
            .handle_message(&wire(ChainId::Stellar, b"complete", &[b"x", b"y"]))
            .await;
        assert_eq!(outcome, MessageOutcome::Forwarded { signatures: 2 });
        assert_eq!(collector.pending_count(), 1);

        let outcome = collector
            .handle_message(&wire(ChainId::Stellar, b"older", &[b"b"]))
            .await;
        assert_eq!(outcome, MessageOutcome::Forwarded { signatures: 2 });
        assert_eq!(submitter.count(), 2);
        assert_eq!(collector.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_failure_is_not_retried() {
        let submitter = Arc::new(RecordingSubmitter::rejecting("rpc down"));
        let mut collector = Collector::new(
            CollectorConfig::new(ChainId::Stellar).with_quorum(1),
            &ChainRegistry::standard(),
            submitter.clone(),
            ChainMetrics::default(),
        )
        .unwrap();

        let outcome = collector
            .handle_message(&wire(ChainId::Stellar, b"body", &[b"a"]))
            .await;
        assert!(matches!(outcome, MessageOutcome::SubmitFailed { .. }));

        let outcome = collector
            .handle_message(&wire(ChainId::Stellar, b"body", &[b"b"]))
            .await;
        assert_eq!(outcome, MessageOutcome::AlreadyForwarded);
        assert_eq!(submitter.count(), 1);
        assert_eq!(collector.metrics.submit_failures.get(), 1);
    }

    #[tokio::test]
    async fn test_pending_gauge_tracks_table() {
        let (mut collector, _) = collector(ChainId::Ethereum, 2);
        collector
            .handle_message(&wire(ChainId::Ethereum, b"one", &[b"a"]))
            .await;
        collector
            .handle_message(&wire(ChainId::Ethereum, b"two", &[b"a"]))
            .await;
        assert_eq!(collector.metrics.pending.get(), 2);
        collector
            .handle_message(&wire(ChainId::Ethereum, b"one", &[b"b"]))
            .await;
        assert_eq!(collector.metrics.pending.get(), 1);
        assert_eq!(collector.pending_count(), 1);
        assert_eq!(collector.metrics.merged_signatures.get(), 3);
    }
}
