use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use starbridge_collector::metrics::CollectorMetrics;
use starbridge_relay::peer_manager::{PeerOrigin, PeerStatus};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OriginLabels {
    pub origin: String,
}

/// Node-wide Prometheus metrics.
pub struct NodeMetrics {
    pub peer_count: Gauge,
    pub peers_by_origin: Family<OriginLabels, Gauge>,
    pub collectors: CollectorMetrics,
    pub registry: Registry,
}

impl NodeMetrics {
    /// Create a new metrics registry with all node metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let peer_count = Gauge::default();
        registry.register(
            "starbridge_peer_count",
            "Number of connected peers",
            peer_count.clone(),
        );

        let peers_by_origin = Family::<OriginLabels, Gauge>::default();
        registry.register(
            "starbridge_peers",
            "Connected peers by how the connection was made",
            peers_by_origin.clone(),
        );

        let collectors = CollectorMetrics::new();
        collectors.register(&mut registry);

        Self {
            peer_count,
            peers_by_origin,
            collectors,
            registry,
        }
    }

    /// Update the peer gauges from a relay status snapshot.
    pub fn record_peers(&self, status: &PeerStatus) {
        self.peer_count.set(status.total() as i64);
        for origin in PeerOrigin::ALL {
            self.peers_by_origin
                .get_or_create(&OriginLabels {
                    origin: origin.as_str().to_string(),
                })
                .set(status.count(origin) as i64);
        }
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
