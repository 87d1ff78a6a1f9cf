//! Node Configuration

use clap::Parser;
use ledger_consensus::ReplicationConfig;

/// Replicated ledger node
#[derive(Parser, Debug)]
#[command(name = "ledger-node")]
#[command(about = "Hash-linked ledger replicated across websocket peers", long_about = None)]
pub struct Args {
    /// HTTP control API port
    #[arg(long, env = "HTTP_PORT", default_value = "3001")]
    pub http_port: u16,

    /// Peer-protocol websocket port
    #[arg(long, env = "P2P_PORT", default_value = "6001")]
    pub p2p_port: u16,

    /// Peers to dial at startup, comma separated (host:port or ws:// URL)
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Interface both listeners bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_host: String,

    /// Upper bound on a single send to a peer
    #[arg(long, default_value = "5000")]
    pub send_timeout_ms: u64,

    /// Upper bound on dialing a peer
    #[arg(long, default_value = "5000")]
    pub connect_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Settings read once at startup
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP bind address
    pub http_addr: String,
    /// Initial peers, blanks removed
    pub peers: Vec<String>,
    /// Core replication settings
    pub replication: ReplicationConfig,
}

impl From<&Args> for NodeConfig {
    fn from(args: &Args) -> Self {
        let peers = args
            .peers
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        Self {
            http_addr: format!("{}:{}", args.bind_host, args.http_port),
            peers,
            replication: ReplicationConfig {
                p2p_addr: format!("{}:{}", args.bind_host, args.p2p_port),
                send_timeout_ms: args.send_timeout_ms,
                connect_timeout_ms: args.connect_timeout_ms,
                ..Default::default()
            },
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:3001".to_string(),
            peers: Vec::new(),
            replication: ReplicationConfig::default(),
        }
    }
}
