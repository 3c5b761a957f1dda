use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use starbridge_crypto::keys::Keypair;
use starbridge_relay::discovery::parse_peer_list;
use starbridge_relay::error::RelayError;
use starbridge_relay::protocol::signed_messages_topic;
use starbridge_relay::relay::bootstrap;
use starbridge_types::chain::ChainId;
use starbridge_types::envelope::Envelope;
use starbridge_types::primitives::short_hex;
use starbridge_types::registry::ChainRegistry;

use crate::config::{NodeConfig, DEFAULT_CONFIG_FILE};
use crate::error::NodeError;

#[derive(Parser)]
#[command(
    name = "starbridge",
    about = "Starbridge witness relay: gossips signed bridge attestations and collects quorums",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the relay node
    Run {
        /// Path to config file (defaults to ./starbridge.toml if present)
        #[arg(short, long)]
        config: Option<String>,
        /// Override the P2P listen port
        #[arg(long)]
        port: Option<u16>,
        /// Comma-separated static peer multiaddrs
        #[arg(long)]
        peers: Option<String>,
        /// Override the signature quorum
        #[arg(long)]
        quorum: Option<usize>,
        /// Disable mDNS local discovery
        #[arg(long)]
        no_mdns: bool,
        /// Chain to collect for (can be specified multiple times)
        #[arg(long = "chain")]
        chains: Vec<String>,
    },
    /// Initialize a new node configuration
    Init {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: String,
    },
    /// Generate a new witness keypair
    Keygen,
    /// Sign a transaction body with the witness key and gossip it
    Attest {
        /// Path to config file (defaults to ./starbridge.toml if present)
        #[arg(short, long)]
        config: Option<String>,
        /// Destination chain
        #[arg(long)]
        chain: String,
        /// Hex-encoded transaction body
        #[arg(long)]
        body: String,
        /// Comma-separated peer multiaddrs to publish through
        #[arg(long)]
        peers: Option<String>,
        /// P2P listen port for this short-lived node (0 picks a free port)
        #[arg(long, default_value_t = 0)]
        port: u16,
        /// Seconds to wait for peers before giving up
        #[arg(long, default_value_t = 10)]
        wait: u64,
    },
    /// Print the gossip topic names
    Topics,
}

impl Cli {
    /// Log level from the config file this command would use, or "info".
    pub fn log_level(&self) -> String {
        let config = match &self.command {
            Command::Run { config, .. } | Command::Attest { config, .. } => config.as_deref(),
            _ => return "info".to_string(),
        };
        resolve_config(config)
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    }
}

/// Load `path`, or `./starbridge.toml` if it exists, or the defaults.
fn resolve_config(path: Option<&str>) -> Result<NodeConfig, NodeError> {
    match path {
        Some(path) => NodeConfig::load(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => NodeConfig::load(DEFAULT_CONFIG_FILE),
        None => Ok(NodeConfig::default()),
    }
}

fn parse_chain(name: &str) -> Result<ChainId, NodeError> {
    ChainId::parse(name).ok_or_else(|| NodeError::ConfigError {
        reason: format!("unknown chain '{}', expected 'stellar' or 'ethereum'", name),
    })
}

fn set_listen_port(config: &mut NodeConfig, port: u16) -> Result<(), NodeError> {
    let mut addr: SocketAddr =
        config
            .network
            .listen_addr
            .parse()
            .map_err(|e| NodeError::ConfigError {
                reason: format!("invalid listen_addr '{}': {}", config.network.listen_addr, e),
            })?;
    addr.set_port(port);
    config.network.listen_addr = addr.to_string();
    Ok(())
}

/// Apply `run` flag overrides on top of the loaded config.
pub fn apply_run_overrides(
    config: &mut NodeConfig,
    port: Option<u16>,
    peers: Option<&str>,
    quorum: Option<usize>,
    no_mdns: bool,
    chains: &[String],
) -> Result<(), NodeError> {
    if let Some(port) = port {
        set_listen_port(config, port)?;
    }
    if let Some(peers) = peers {
        config.network.static_peers.extend(parse_peer_list(peers));
    }
    if let Some(quorum) = quorum {
        config.collector.quorum = quorum;
    }
    if no_mdns {
        config.network.enable_mdns = false;
    }
    if !chains.is_empty() {
        config.collector.chains = chains
            .iter()
            .map(|c| parse_chain(c))
            .collect::<Result<_, _>>()?;
    }
    config.validate()
}

pub async fn run(cli: Cli) -> Result<(), NodeError> {
    match cli.command {
        Command::Run {
            config,
            port,
            peers,
            quorum,
            no_mdns,
            chains,
        } => {
            let mut config = resolve_config(config.as_deref())?;
            apply_run_overrides(
                &mut config,
                port,
                peers.as_deref(),
                quorum,
                no_mdns,
                &chains,
            )?;

            // Print compact startup summary.
            {
                let dim = console::Style::new().dim();
                let cyan = console::Style::new().cyan();
                let chains: Vec<&str> = config.collector.chains.iter().map(|c| c.as_str()).collect();
                println!(
                    "  {}  {}",
                    dim.apply_to("Listen  "),
                    cyan.apply_to(&config.network.listen_addr),
                );
                println!(
                    "  {}  {} (quorum {})",
                    dim.apply_to("Chains  "),
                    cyan.apply_to(chains.join(", ")),
                    cyan.apply_to(config.collector.quorum),
                );
                println!(
                    "  {}  {} static · mDNS {}",
                    dim.apply_to("Peers   "),
                    cyan.apply_to(config.network.static_peers.len()),
                    cyan.apply_to(if config.network.enable_mdns { "on" } else { "off" }),
                );
                println!();
            }

            let mut node = crate::node::Node::new(config).await?;
            node.run().await
        }
        Command::Init { dir } => {
            NodeConfig::init(&dir)?;
            tracing::info!("Node configuration initialized in {}", dir);
            Ok(())
        }
        Command::Keygen => {
            let keypair = Keypair::generate();
            println!("Seed:       {}", hex::encode(keypair.seed()));
            println!("Public key: {}", hex::encode(keypair.public_key()));
            println!("Put the seed under [witness] keypair_seed in {}.", DEFAULT_CONFIG_FILE);
            Ok(())
        }
        Command::Attest {
            config,
            chain,
            body,
            peers,
            port,
            wait,
        } => {
            let mut config = resolve_config(config.as_deref())?;
            set_listen_port(&mut config, port)?;
            if let Some(peers) = peers {
                config.network.static_peers = parse_peer_list(&peers);
            }
            config.validate()?;

            let keypair = config.witness_keypair()?.ok_or_else(|| NodeError::ConfigError {
                reason: "attest needs [witness] keypair_seed; run `starbridge keygen`".to_string(),
            })?;
            let chain = parse_chain(&chain)?;
            let body = hex::decode(body.trim()).map_err(|e| NodeError::ConfigError {
                reason: format!("invalid body hex: {}", e),
            })?;

            let signature = keypair.attest(chain, &body);
            let envelope = Envelope::new(chain, body, vec![signature]);
            attest(config, envelope, Duration::from_secs(wait)).await
        }
        Command::Topics => {
            for chain in ChainRegistry::standard().chain_ids() {
                println!("{:<10} {}", chain.as_str(), signed_messages_topic(chain));
            }
            Ok(())
        }
    }
}

/// Bring up a short-lived relay, publish one envelope, and stop.
async fn attest(config: NodeConfig, envelope: Envelope, wait: Duration) -> Result<(), NodeError> {
    let relay = bootstrap(config.relay_config()?).await?;
    let deadline = tokio::time::Instant::now() + wait;

    let peers = relay.wait_for_peers(1, wait).await?;
    if peers == 0 {
        tracing::warn!("no peers connected, publishing anyway");
    }

    // Remote subscriptions arrive shortly after the connection does, so retry
    // until the publish goes out or time runs out.
    let result = loop {
        match relay.publish_envelope(&envelope).await {
            Ok(()) => break Ok(()),
            Err(RelayError::PublishError { reason, .. })
                if tokio::time::Instant::now() < deadline =>
            {
                tracing::debug!("publish not yet possible: {}", reason);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Err(e) => break Err(e),
        }
    };

    if result.is_ok() {
        // Give gossipsub a moment to flush before the connection drops.
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!(
            "Published {} attestation {} on {}",
            envelope.chain(),
            short_hex(&envelope.content_hash()),
            signed_messages_topic(envelope.chain())
        );
    }
    relay.shutdown().await;
    result.map_err(NodeError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "starbridge",
            "run",
            "--port",
            "4001",
            "--peers",
            "/ip4/10.0.0.1/tcp/9745,/ip4/10.0.0.2/tcp/9745",
            "--quorum",
            "3",
            "--no-mdns",
            "--chain",
            "stellar",
        ])
        .unwrap();
        match cli.command {
            Command::Run {
                port,
                peers,
                quorum,
                no_mdns,
                chains,
                ..
            } => {
                let mut config = NodeConfig::default();
                apply_run_overrides(
                    &mut config,
                    port,
                    peers.as_deref(),
                    quorum,
                    no_mdns,
                    &chains,
                )
                .unwrap();
                assert_eq!(config.network.listen_addr, "0.0.0.0:4001");
                assert_eq!(config.network.static_peers.len(), 2);
                assert_eq!(config.collector.quorum, 3);
                assert!(!config.network.enable_mdns);
                assert_eq!(config.collector.chains, vec![ChainId::Stellar]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_overrides_reject_bad_values() {
        let mut config = NodeConfig::default();
        assert!(apply_run_overrides(&mut config, None, None, Some(0), false, &[]).is_err());

        let mut config = NodeConfig::default();
        let chains = vec!["dogecoin".to_string()];
        assert!(apply_run_overrides(&mut config, None, None, None, false, &chains).is_err());
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        assert!(resolve_config(Some("/nonexistent/starbridge.toml")).is_err());
    }
}
