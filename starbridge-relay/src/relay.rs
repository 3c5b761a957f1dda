use futures::StreamExt;
use libp2p::gossipsub::{self, IdentTopic, TopicHash};
use libp2p::mdns;
use libp2p::multiaddr::Protocol;
use libp2p::swarm::dial_opts::DialOpts;
use libp2p::swarm::{ConnectionId, DialError, SwarmEvent};
use libp2p::{Multiaddr, PeerId, Swarm, SwarmBuilder};
use starbridge_types::constants::TOPIC_CHANNEL_CAPACITY;
use starbridge_types::envelope::Envelope;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::behaviour::{build_behaviour, StarbridgeBehaviour, StarbridgeBehaviourEvent};
use crate::codec;
use crate::config::RelayConfig;
use crate::discovery::Discovery;
use crate::error::RelayError;
use crate::peer_manager::{PeerManager, PeerOrigin, PeerStatus};
use crate::protocol::signed_messages_topic;

/// Capacity of the handle -> swarm task command queue.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// A gossip message delivered on a joined topic.
#[derive(Debug, Clone)]
pub struct GossipMessage {
    /// Topic name the message arrived on.
    pub topic: String,
    /// Original author, when the message is signed.
    pub source: Option<PeerId>,
    /// Peer that forwarded it to us.
    pub propagation_source: PeerId,
    pub data: Vec<u8>,
}

/// Receiving side of a joined topic. One consumer per subscription.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<GossipMessage>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message on this topic.
    ///
    /// Returns `SubscriptionClosed` once the network task has stopped. If this consumer
    /// fell behind and messages were overwritten, that is logged and receiving
    /// continues.
    pub async fn next(&mut self) -> Result<GossipMessage, RelayError> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Ok(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(RelayError::SubscriptionClosed {
                        topic: self.topic.clone(),
                    });
                }
            }
        }
    }
}

/// Requests from a `RelayHandle` to the swarm task.
enum Command {
    Join {
        topic: String,
        reply: oneshot::Sender<Result<bool, RelayError>>,
    },
    Subscribe {
        topic: String,
        reply: oneshot::Sender<Result<broadcast::Receiver<GossipMessage>, RelayError>>,
    },
    Publish {
        topic: String,
        data: Vec<u8>,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Dial {
        addr: Multiaddr,
        reply: oneshot::Sender<Result<PeerId, RelayError>>,
    },
    ConnectedPeers {
        reply: oneshot::Sender<Vec<PeerId>>,
    },
    PeerStatus {
        reply: oneshot::Sender<PeerStatus>,
    },
    ListenAddrs {
        reply: oneshot::Sender<Vec<Multiaddr>>,
    },
    Shutdown,
}

/// A relay host that has been constructed and is listening, but whose event loop has
/// not started yet.
pub struct RelayNode {
    config: RelayConfig,
    swarm: Swarm<StarbridgeBehaviour>,
    discovery: Discovery,
}

impl RelayNode {
    /// Create the host and gossip bus and start listening on the configured address.
    ///
    /// This is the only fallible bootstrap step. Peer connectivity is established in
    /// `start` and never fails it.
    pub async fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let keypair = if let Some(seed) = &config.keypair_seed {
            let mut seed_bytes = *seed;
            libp2p::identity::Keypair::ed25519_from_bytes(&mut seed_bytes).map_err(|e| {
                RelayError::NetworkError {
                    reason: format!("invalid keypair seed: {}", e),
                }
            })?
        } else {
            libp2p::identity::Keypair::generate_ed25519()
        };

        let enable_mdns = config.enable_mdns;
        let mut swarm = SwarmBuilder::with_existing_identity(keypair)
            .with_tokio()
            .with_tcp(
                libp2p::tcp::Config::default(),
                libp2p::noise::Config::new,
                libp2p::yamux::Config::default,
            )
            .map_err(|e| RelayError::NetworkError {
                reason: format!("tcp transport: {}", e),
            })?
            .with_dns()
            .map_err(|e| RelayError::NetworkError {
                reason: format!("dns transport: {}", e),
            })?
            .with_behaviour(|key| build_behaviour(key, enable_mdns))
            .map_err(|e| RelayError::NetworkError {
                reason: format!("behaviour: {}", e),
            })?
            .with_swarm_config(|cfg| cfg.with_idle_connection_timeout(Duration::from_secs(60)))
            .build();

        let listen_addr: Multiaddr = format!(
            "/ip4/{}/tcp/{}",
            config.listen_addr.ip(),
            config.listen_addr.port()
        )
        .parse()
        .map_err(|e| RelayError::NetworkError {
            reason: format!("parse listen addr: {}", e),
        })?;

        swarm
            .listen_on(listen_addr)
            .map_err(|e| RelayError::NetworkError {
                reason: format!("listen: {}", e),
            })?;

        let discovery = Discovery::new(&config.static_peers);

        info!(
            peer_id = %swarm.local_peer_id(),
            listen = %config.listen_addr,
            mdns = swarm.behaviour().mdns.is_enabled(),
            static_peers = discovery.static_addrs().len(),
            "relay host created"
        );

        Ok(Self {
            config,
            swarm,
            discovery,
        })
    }

    /// Get the local peer ID.
    pub fn local_peer_id(&self) -> PeerId {
        *self.swarm.local_peer_id()
    }

    /// Spawn the swarm task and dial every static peer.
    ///
    /// All static dials run concurrently and are awaited together. Failed dials are
    /// logged; a node that reaches none of its static peers still comes up and relies
    /// on mDNS and inbound connections.
    pub async fn start(self) -> RelayHandle {
        let RelayNode {
            config,
            swarm,
            discovery,
        } = self;

        let local_peer_id = *swarm.local_peer_id();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let driver = SwarmDriver::new(swarm, command_rx, config.max_connections);
        let task = tokio::spawn(driver.run());

        let handle = RelayHandle {
            local_peer_id,
            commands: command_tx,
            task: Arc::new(Mutex::new(Some(task))),
        };

        let configured = discovery.static_addrs().len();
        let connected = handle
            .dial_static_peers(discovery.static_addrs(), config.dial_timeout)
            .await;
        info!(
            static_connected = connected,
            static_configured = configured,
            "relay bootstrap complete"
        );

        handle
    }
}

/// Construct the host and run the full bootstrap sequence.
pub async fn bootstrap(config: RelayConfig) -> Result<RelayHandle, RelayError> {
    let node = RelayNode::new(config).await?;
    Ok(node.start().await)
}

/// Cloneable handle to a running relay. The swarm task stops on `shutdown` or when
/// every handle is dropped.
#[derive(Clone)]
pub struct RelayHandle {
    local_peer_id: PeerId,
    commands: mpsc::Sender<Command>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RelayHandle {
    /// Get the local peer ID.
    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| RelayError::ChannelError {
                reason: "relay task not running".to_string(),
            })?;
        reply_rx.await.map_err(|_| RelayError::ChannelError {
            reason: "relay task dropped the request".to_string(),
        })
    }

    /// Join a topic. Returns `true` the first time, `false` if already joined.
    pub async fn join(&self, topic: &str) -> Result<bool, RelayError> {
        self.request(|reply| Command::Join {
            topic: topic.to_string(),
            reply,
        })
        .await?
    }

    /// Join `topic` if needed and start receiving its messages.
    pub async fn subscribe(&self, topic: &str) -> Result<Subscription, RelayError> {
        let receiver = self
            .request(|reply| Command::Subscribe {
                topic: topic.to_string(),
                reply,
            })
            .await??;
        Ok(Subscription {
            topic: topic.to_string(),
            receiver,
        })
    }

    /// Publish raw bytes on `topic`, joining it first if needed.
    pub async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), RelayError> {
        self.request(|reply| Command::Publish {
            topic: topic.to_string(),
            data,
            reply,
        })
        .await?
    }

    /// Encode an envelope and publish it on its chain's signed-messages topic.
    pub async fn publish_envelope(&self, envelope: &Envelope) -> Result<(), RelayError> {
        let data = codec::encode_envelope(envelope)?;
        self.publish(&signed_messages_topic(envelope.chain()), data)
            .await
    }

    /// Dial an address and wait until the connection is up or has failed.
    pub async fn dial(&self, addr: Multiaddr) -> Result<PeerId, RelayError> {
        self.request(|reply| Command::Dial { addr, reply }).await?
    }

    /// Dial all `peers` concurrently and wait for every attempt to finish.
    /// Returns how many succeeded.
    pub async fn dial_static_peers(&self, peers: &[Multiaddr], timeout: Duration) -> usize {
        let attempts = peers.iter().cloned().map(|addr| async move {
            match tokio::time::timeout(timeout, self.dial(addr.clone())).await {
                Ok(Ok(peer_id)) => {
                    info!(%addr, %peer_id, "connected to static peer");
                    true
                }
                Ok(Err(e)) => {
                    warn!(%addr, "static peer dial failed: {}", e);
                    false
                }
                Err(_) => {
                    warn!(%addr, ?timeout, "static peer dial timed out");
                    false
                }
            }
        });

        let connected = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();

        if !peers.is_empty() && connected == 0 {
            warn!(
                attempted = peers.len(),
                "no static peers reachable, waiting for discovery"
            );
        }
        connected
    }

    /// Peers we currently hold at least one connection to.
    pub async fn connected_peers(&self) -> Result<Vec<PeerId>, RelayError> {
        self.request(|reply| Command::ConnectedPeers { reply }).await
    }

    /// Connected peer counts by origin.
    pub async fn peer_status(&self) -> Result<PeerStatus, RelayError> {
        self.request(|reply| Command::PeerStatus { reply }).await
    }

    /// Our dialable addresses (listen addresses with the `/p2p/<id>` suffix).
    pub async fn listen_addrs(&self) -> Result<Vec<Multiaddr>, RelayError> {
        self.request(|reply| Command::ListenAddrs { reply }).await
    }

    /// Poll until at least `min` peers are connected or `timeout` passes.
    /// Returns the peer count at the end.
    pub async fn wait_for_peers(&self, min: usize, timeout: Duration) -> Result<usize, RelayError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let count = self.connected_peers().await?.len();
            if count >= min || tokio::time::Instant::now() >= deadline {
                return Ok(count);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Stop the swarm task and wait for it to exit. Every open `Subscription` then
    /// returns `SubscriptionClosed`. Safe to call more than once.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("relay task ended abnormally: {}", e);
            }
        }
    }
}

struct TopicChannel {
    name: String,
    sender: broadcast::Sender<GossipMessage>,
}

/// Owns the swarm and everything that must only be touched from its event loop.
struct SwarmDriver {
    swarm: Swarm<StarbridgeBehaviour>,
    commands: mpsc::Receiver<Command>,
    topics: HashMap<TopicHash, TopicChannel>,
    pending_dials: HashMap<ConnectionId, oneshot::Sender<Result<PeerId, RelayError>>>,
    discovered_dials: HashSet<ConnectionId>,
    peer_manager: PeerManager,
    listen_addrs: Vec<Multiaddr>,
}

impl SwarmDriver {
    fn new(
        swarm: Swarm<StarbridgeBehaviour>,
        commands: mpsc::Receiver<Command>,
        max_connections: usize,
    ) -> Self {
        Self {
            swarm,
            commands,
            topics: HashMap::new(),
            pending_dials: HashMap::new(),
            discovered_dials: HashSet::new(),
            peer_manager: PeerManager::new(max_connections),
            listen_addrs: Vec::new(),
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        info!(peers = self.peer_manager.peer_count(), "relay task stopping");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                },
                event = self.swarm.next() => match event {
                    Some(event) => self.handle_swarm_event(event),
                    None => {
                        error!("swarm stream ended");
                        break;
                    }
                },
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Join { topic, reply } => {
                let _ = reply.send(self.join_topic(&topic));
            }
            Command::Subscribe { topic, reply } => {
                let result = self.join_topic(&topic).and_then(|_| {
                    let hash = IdentTopic::new(topic.as_str()).hash();
                    self.topics
                        .get(&hash)
                        .map(|channel| channel.sender.subscribe())
                        .ok_or_else(|| RelayError::ProtocolError {
                            reason: format!("topic {} not joined", topic),
                        })
                });
                let _ = reply.send(result);
            }
            Command::Publish { topic, data, reply } => {
                let result = self.join_topic(&topic).and_then(|_| {
                    self.swarm
                        .behaviour_mut()
                        .gossipsub
                        .publish(IdentTopic::new(topic.as_str()), data)
                        .map(|_| ())
                        .map_err(|e| RelayError::PublishError {
                            topic: topic.clone(),
                            reason: e.to_string(),
                        })
                });
                let _ = reply.send(result);
            }
            Command::Dial { addr, reply } => {
                let opts = DialOpts::from(addr.clone());
                let connection_id = opts.connection_id();
                match self.swarm.dial(opts) {
                    Ok(()) => {
                        self.pending_dials.insert(connection_id, reply);
                    }
                    Err(e) => {
                        let _ = reply.send(Err(RelayError::ConnectionError {
                            reason: format!("dial {}: {}", addr, e),
                        }));
                    }
                }
            }
            Command::ConnectedPeers { reply } => {
                let _ = reply.send(self.peer_manager.connected_peers().copied().collect());
            }
            Command::PeerStatus { reply } => {
                let _ = reply.send(self.peer_manager.status());
            }
            Command::ListenAddrs { reply } => {
                let local = *self.swarm.local_peer_id();
                let addrs = self
                    .listen_addrs
                    .iter()
                    .map(|addr| addr.clone().with(Protocol::P2p(local)))
                    .collect();
                let _ = reply.send(addrs);
            }
            Command::Shutdown => {}
        }
    }

    /// Idempotent per topic: gossipsub is only asked to subscribe once.
    fn join_topic(&mut self, name: &str) -> Result<bool, RelayError> {
        let topic = IdentTopic::new(name);
        let hash = topic.hash();
        if self.topics.contains_key(&hash) {
            return Ok(false);
        }

        self.swarm
            .behaviour_mut()
            .gossipsub
            .subscribe(&topic)
            .map_err(|e| RelayError::ProtocolError {
                reason: format!("subscribe to {}: {}", name, e),
            })?;

        let (sender, _) = broadcast::channel(TOPIC_CHANNEL_CAPACITY);
        self.topics.insert(
            hash,
            TopicChannel {
                name: name.to_string(),
                sender,
            },
        );
        info!(topic = name, "joined topic");
        Ok(true)
    }

    fn handle_swarm_event(&mut self, event: SwarmEvent<StarbridgeBehaviourEvent>) {
        match event {
            SwarmEvent::Behaviour(event) => self.handle_behaviour_event(event),
            SwarmEvent::ConnectionEstablished {
                peer_id,
                connection_id,
                endpoint,
                num_established,
                ..
            } => {
                let dial_reply = self.pending_dials.remove(&connection_id);
                let origin = if dial_reply.is_some() {
                    PeerOrigin::Static
                } else if self.discovered_dials.remove(&connection_id) {
                    PeerOrigin::Discovered
                } else if endpoint.is_dialer() {
                    PeerOrigin::Static
                } else {
                    PeerOrigin::Inbound
                };

                let accepted = if num_established.get() > 1
                    && self.peer_manager.peer(&peer_id).is_some()
                {
                    debug!(%peer_id, "additional connection established");
                    true
                } else {
                    let remote = endpoint.get_remote_address().clone();
                    if self.peer_manager.add_peer(peer_id, remote.clone(), origin) {
                        info!(
                            %peer_id,
                            %remote,
                            origin = origin.as_str(),
                            peers = self.peer_manager.peer_count(),
                            "peer connected"
                        );
                        true
                    } else {
                        warn!(%peer_id, "peer limit reached, disconnecting peer");
                        let _ = self.swarm.disconnect_peer_id(peer_id);
                        false
                    }
                };

                // Only report a dial as connected once the peer is admitted.
                if let Some(reply) = dial_reply {
                    let result = if accepted {
                        Ok(peer_id)
                    } else {
                        Err(RelayError::ConnectionError {
                            reason: "peer limit reached".to_string(),
                        })
                    };
                    let _ = reply.send(result);
                }
            }
            SwarmEvent::OutgoingConnectionError {
                connection_id,
                peer_id,
                error,
            } => {
                if let Some(reply) = self.pending_dials.remove(&connection_id) {
                    let _ = reply.send(Err(RelayError::ConnectionError {
                        reason: error.to_string(),
                    }));
                } else {
                    self.discovered_dials.remove(&connection_id);
                    warn!(peer = ?peer_id, "outgoing connection failed: {}", error);
                }
            }
            SwarmEvent::IncomingConnectionError {
                send_back_addr,
                error,
                ..
            } => {
                debug!(%send_back_addr, "incoming connection failed: {}", error);
            }
            SwarmEvent::ConnectionClosed {
                peer_id,
                num_established,
                cause,
                ..
            } => {
                if num_established > 0 {
                    return;
                }
                if let Some(info) = self.peer_manager.remove_peer(&peer_id) {
                    info!(
                        %peer_id,
                        remote = %info.remote_addr,
                        origin = info.origin.as_str(),
                        agent = info.agent_version.as_deref().unwrap_or("unknown"),
                        connected_secs = info.connected_at.elapsed().as_secs(),
                        ?cause,
                        peers = self.peer_manager.peer_count(),
                        "peer disconnected"
                    );
                }
            }
            SwarmEvent::NewListenAddr { address, .. } => {
                let dialable = address.clone().with(Protocol::P2p(*self.swarm.local_peer_id()));
                info!(%dialable, "listening on new address");
                self.listen_addrs.push(address);
            }
            SwarmEvent::ExpiredListenAddr { address, .. } => {
                debug!(%address, "listen address expired");
                self.listen_addrs.retain(|a| a != &address);
            }
            SwarmEvent::Dialing { peer_id, .. } => {
                debug!(peer = ?peer_id, "dialing");
            }
            _ => {}
        }
    }

    fn handle_behaviour_event(&mut self, event: StarbridgeBehaviourEvent) {
        match event {
            StarbridgeBehaviourEvent::Gossipsub(gossipsub::Event::Message {
                propagation_source,
                message,
                ..
            }) => match self.topics.get(&message.topic) {
                Some(channel) => {
                    debug!(
                        %propagation_source,
                        topic = %channel.name,
                        bytes = message.data.len(),
                        "received gossip message"
                    );
                    let delivered = GossipMessage {
                        topic: channel.name.clone(),
                        source: message.source,
                        propagation_source,
                        data: message.data,
                    };
                    if channel.sender.send(delivered).is_err() {
                        debug!(topic = %channel.name, "no subscribers, message dropped");
                    }
                }
                None => {
                    debug!(topic = %message.topic, "message on a topic we have not joined");
                }
            },
            StarbridgeBehaviourEvent::Gossipsub(gossipsub::Event::Subscribed { peer_id, topic }) => {
                debug!(%peer_id, %topic, "peer joined topic");
            }
            StarbridgeBehaviourEvent::Mdns(mdns::Event::Discovered(peers)) => {
                let local = *self.swarm.local_peer_id();
                for (peer_id, addr) in peers {
                    if self.peer_manager.is_full() {
                        debug!(%peer_id, "peer limit reached, not dialing discovered peer");
                        break;
                    }
                    let connected = self.swarm.is_connected(&peer_id);
                    if !Discovery::should_dial(&local, &peer_id, connected) {
                        continue;
                    }
                    debug!(%peer_id, %addr, "mDNS discovered peer");
                    let opts = DialOpts::peer_id(peer_id)
                        .addresses(vec![addr.clone()])
                        .build();
                    let connection_id = opts.connection_id();
                    match self.swarm.dial(opts) {
                        Ok(()) => {
                            self.discovered_dials.insert(connection_id);
                        }
                        // Already dialing this peer via another discovered address.
                        Err(DialError::DialPeerConditionFalse(_)) => {}
                        Err(e) => {
                            warn!(%peer_id, %addr, "failed to dial discovered peer: {}", e);
                        }
                    }
                }
            }
            StarbridgeBehaviourEvent::Mdns(mdns::Event::Expired(peers)) => {
                for (peer_id, addr) in peers {
                    debug!(%peer_id, %addr, "mDNS record expired");
                }
            }
            StarbridgeBehaviourEvent::Identify(libp2p::identify::Event::Received {
                peer_id,
                info,
                ..
            }) => {
                debug!(
                    %peer_id,
                    protocol = %info.protocol_version,
                    agent = %info.agent_version,
                    "identified peer"
                );
                self.peer_manager
                    .set_agent_version(&peer_id, info.agent_version);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::time::timeout;

    fn test_config() -> RelayConfig {
        RelayConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            static_peers: vec![],
            enable_mdns: false,
            max_connections: 50,
            keypair_seed: None,
            dial_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_relay_node_creation() {
        let node = RelayNode::new(test_config()).await;
        assert!(node.is_ok());
    }

    #[tokio::test]
    async fn test_relay_node_with_seed() {
        let mut config = test_config();
        config.keypair_seed = Some([42u8; 32]);
        let node1 = RelayNode::new(config.clone()).await.unwrap();
        let node2 = RelayNode::new(config).await.unwrap();
        assert_eq!(node1.local_peer_id(), node2.local_peer_id());
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let handle = bootstrap(test_config()).await.unwrap();
        let topic = signed_messages_topic(starbridge_types::chain::ChainId::Stellar);
        assert!(handle.join(&topic).await.unwrap());
        assert!(!handle.join(&topic).await.unwrap());
        // Subscribing to an already-joined topic must not fail.
        let sub = handle.subscribe(&topic).await.unwrap();
        assert_eq!(sub.topic(), topic);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_bootstrap_survives_unreachable_static_peers() {
        let mut config = test_config();
        config.static_peers = vec![
            "/ip4/127.0.0.1/tcp/1".to_string(),
            "/ip4/127.0.0.1/tcp/2".to_string(),
            "garbage".to_string(),
        ];
        let handle = timeout(Duration::from_secs(10), bootstrap(config))
            .await
            .expect("bootstrap hung")
            .expect("bootstrap failed");

        assert!(handle.connected_peers().await.unwrap().is_empty());
        let topic = signed_messages_topic(starbridge_types::chain::ChainId::Ethereum);
        assert!(handle.subscribe(&topic).await.is_ok());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_listen_addrs_are_dialable() {
        let handle = bootstrap(test_config()).await.unwrap();
        let local = handle.local_peer_id();
        let addrs = timeout(Duration::from_secs(5), async {
            loop {
                let addrs = handle.listen_addrs().await.unwrap();
                if !addrs.is_empty() {
                    return addrs;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("no listen address");
        assert!(addrs
            .iter()
            .all(|a| a.iter().any(|p| p == Protocol::P2p(local))));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscriptions() {
        let handle = bootstrap(test_config()).await.unwrap();
        let mut sub = handle.subscribe("starbridge-test").await.unwrap();
        let waiter = tokio::spawn(async move { sub.next().await });

        handle.shutdown().await;
        let result = timeout(Duration::from_secs(5), waiter)
            .await
            .expect("blocked receive did not return")
            .unwrap();
        assert!(matches!(
            result,
            Err(RelayError::SubscriptionClosed { .. })
        ));

        // The handle is dead after shutdown.
        assert!(matches!(
            handle.join("starbridge-test").await,
            Err(RelayError::ChannelError { .. })
        ));
        // A second shutdown is a no-op.
        handle.shutdown().await;
    }

    async fn first_listen_addr(handle: &RelayHandle) -> Multiaddr {
        timeout(Duration::from_secs(5), async {
            loop {
                if let Some(addr) = handle.listen_addrs().await.unwrap().into_iter().next() {
                    return addr;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("no listen address")
    }

    #[tokio::test]
    async fn test_static_dials_over_peer_limit_are_not_counted() {
        let a = bootstrap(test_config()).await.unwrap();
        let b = bootstrap(test_config()).await.unwrap();
        let targets = vec![first_listen_addr(&a).await, first_listen_addr(&b).await];

        let mut config = test_config();
        config.max_connections = 1;
        let node = bootstrap(config).await.unwrap();

        let connected = node
            .dial_static_peers(&targets, Duration::from_secs(5))
            .await;
        assert_eq!(connected, 1);
        assert_eq!(node.connected_peers().await.unwrap().len(), 1);
        assert_eq!(
            node.peer_status().await.unwrap(),
            PeerStatus {
                static_peers: 1,
                discovered: 0,
                inbound: 0
            }
        );

        node.shutdown().await;
        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn test_peer_status_tracks_origin() {
        let server = bootstrap(test_config()).await.unwrap();
        let addr = first_listen_addr(&server).await;
        let client = bootstrap(test_config()).await.unwrap();

        assert_eq!(client.dial(addr).await.unwrap(), server.local_peer_id());
        assert_eq!(client.peer_status().await.unwrap().static_peers, 1);

        let status = timeout(Duration::from_secs(5), async {
            loop {
                let status = server.peer_status().await.unwrap();
                if status.total() > 0 {
                    return status;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("server never saw the inbound connection");
        assert_eq!(status.inbound, 1);

        client.shutdown().await;
        server.shutdown().await;
    }

    #[tokio::test]
    #[ignore = "needs multicast on the local network"]
    async fn test_mdns_discovered_peers_are_dialed() {
        let mut config = test_config();
        config.enable_mdns = true;
        let a = bootstrap(config.clone()).await.unwrap();
        let b = bootstrap(config).await.unwrap();

        let discovered = timeout(Duration::from_secs(30), async {
            loop {
                let a_status = a.peer_status().await.unwrap();
                let b_status = b.peer_status().await.unwrap();
                if a_status.discovered + b_status.discovered > 0 {
                    return (a_status, b_status);
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await
        .expect("mDNS never connected the nodes");
        assert_eq!(discovered.0.static_peers + discovered.1.static_peers, 0);

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn test_dial_unreachable_returns_error() {
        let handle = bootstrap(test_config()).await.unwrap();
        let result = timeout(
            Duration::from_secs(10),
            handle.dial("/ip4/127.0.0.1/tcp/1".parse().unwrap()),
        )
        .await
        .expect("dial hung");
        assert!(matches!(result, Err(RelayError::ConnectionError { .. })));
        handle.shutdown().await;
    }
}
