use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use starbridge_collector::collector::Collector;
use starbridge_collector::error::CollectorError;
use starbridge_collector::submitter::{LoggingSubmitter, Submitter};
use starbridge_relay::relay::{bootstrap, RelayHandle, Subscription};
use starbridge_types::chain::ChainId;
use starbridge_types::registry::ChainRegistry;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;

/// How often the peer gauge is refreshed.
const PEER_STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// How long shutdown waits for collectors to drain.
const COLLECTOR_STOP_TIMEOUT: Duration = Duration::from_secs(5);

type CollectorTask = (ChainId, Result<(), CollectorError>);

/// A running relay plus one collector per configured chain.
pub struct Node {
    metrics: Arc<NodeMetrics>,
    relay: RelayHandle,
    /// Subscribed collectors not yet spawned.
    ready: Vec<(Collector, Subscription)>,
    collectors: JoinSet<CollectorTask>,
    shutdown_tx: watch::Sender<bool>,
    stopped: bool,
}

impl Node {
    /// Create a node that logs quorum bodies instead of submitting them.
    pub async fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let registry = Arc::new(ChainRegistry::standard());
        let submitter = Arc::new(LoggingSubmitter::new(registry.clone()));
        Self::with_submitter(config, registry, submitter).await
    }

    /// Bootstrap the relay and subscribe a collector for every configured chain.
    pub async fn with_submitter(
        config: NodeConfig,
        registry: Arc<ChainRegistry>,
        submitter: Arc<dyn Submitter>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let metrics = Arc::new(NodeMetrics::new());

        let relay = bootstrap(config.relay_config()?).await?;

        let mut ready = Vec::new();
        for collector_config in config.collector_configs() {
            let chain = collector_config.chain;
            let mut collector = Collector::new(
                collector_config,
                &registry,
                submitter.clone(),
                metrics.collectors.for_chain(chain),
            )?;
            let subscription = collector.subscribe(&relay).await?;
            ready.push((collector, subscription));
        }

        let (shutdown_tx, _) = watch::channel(false);

        tracing::info!(
            peer_id = %relay.local_peer_id(),
            collectors = ready.len(),
            quorum = config.collector.quorum,
            "node initialized"
        );

        Ok(Self {
            metrics,
            relay,
            ready,
            collectors: JoinSet::new(),
            shutdown_tx,
            stopped: false,
        })
    }

    /// Run until Ctrl+C.
    pub async fn run(&mut self) -> Result<(), NodeError> {
        tracing::info!("Node is running. Press Ctrl+C to stop.");
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `signal` completes or a collector fails.
    pub async fn run_until<F>(&mut self, signal: F) -> Result<(), NodeError>
    where
        F: Future<Output = ()>,
    {
        for (mut collector, subscription) in self.ready.drain(..) {
            let shutdown = self.shutdown_tx.subscribe();
            self.collectors.spawn(async move {
                let chain = collector.chain();
                let result = collector.run(subscription, shutdown).await;
                (chain, result)
            });
        }

        let mut status = tokio::time::interval(PEER_STATUS_INTERVAL);
        tokio::pin!(signal);

        let result = loop {
            tokio::select! {
                _ = &mut signal => {
                    tracing::info!("Received shutdown signal");
                    break Ok(());
                }
                _ = status.tick() => self.refresh_peer_count().await,
                Some(joined) = self.collectors.join_next() => match joined {
                    Ok((chain, Ok(()))) => {
                        tracing::warn!(%chain, "collector exited");
                    }
                    Ok((chain, Err(e))) => {
                        tracing::error!(%chain, "collector failed: {}", e);
                        break Err(e.into());
                    }
                    Err(e) => {
                        break Err(NodeError::TaskError {
                            reason: format!("collector task failed: {}", e),
                        });
                    }
                },
            }
        };

        self.shutdown().await;
        result
    }

    async fn refresh_peer_count(&self) {
        match self.relay.peer_status().await {
            Ok(status) => {
                self.metrics.record_peers(&status);
                tracing::debug!(
                    peers = status.total(),
                    static_peers = status.static_peers,
                    discovered = status.discovered,
                    inbound = status.inbound,
                    "peer status"
                );
            }
            Err(e) => tracing::warn!("failed to read peer status: {}", e),
        }
    }

    /// Stop collectors, then the relay. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        tracing::info!("Shutting down node...");

        let _ = self.shutdown_tx.send(true);
        let drain = async {
            while let Some(joined) = self.collectors.join_next().await {
                if let Ok((chain, Err(e))) = joined {
                    tracing::warn!(%chain, "collector ended with error during shutdown: {}", e);
                }
            }
        };
        if tokio::time::timeout(COLLECTOR_STOP_TIMEOUT, drain).await.is_err() {
            tracing::warn!("collectors did not stop in time, aborting");
            self.collectors.abort_all();
        }
        self.ready.clear();

        self.relay.shutdown().await;

        match self.metrics.encode() {
            Ok(encoded) => tracing::debug!("final metrics:\n{}", encoded),
            Err(e) => tracing::debug!("failed to encode metrics: {}", e),
        }
        tracing::info!("Node shutdown complete");
    }

    pub fn relay(&self) -> &RelayHandle {
        &self.relay
    }
}
