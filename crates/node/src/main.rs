//! Ledger Node
//!
//! Main entry point: starts the peer listener, dials the initial peers and
//! serves the HTTP control API. The chain lives in memory only.

use anyhow::Result;
use clap::Parser;
use ledger_consensus::{Node, NodeBuilder};
use ledger_rpc::{HttpServer, RpcServerConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{Args, NodeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    run(NodeConfig::from(&args)).await
}

async fn run(config: NodeConfig) -> Result<()> {
    tracing::info!("Starting ledger node");
    tracing::info!("  HTTP: {}", config.http_addr);
    tracing::info!("  P2P: {}", config.replication.p2p_addr);
    tracing::info!("  Initial peers: {:?}", config.peers);

    let replication = &config.replication;
    let node: Arc<Node> = Arc::new(
        NodeBuilder::new()
            .p2p_addr(&replication.p2p_addr)
            .send_timeout_ms(replication.send_timeout_ms)
            .connect_timeout_ms(replication.connect_timeout_ms)
            .outbound_queue_len(replication.outbound_queue_len)
            .build(),
    );

    // Start peer listener
    node.start().await?;

    // Dial initial peers; failures are logged and skipped
    for peer in &config.peers {
        let _ = node.add_peer(peer).await;
    }

    // Start HTTP control server
    let rpc = RpcServerConfig {
        http_addr: config.http_addr.clone(),
    };
    let http_node = node.clone();
    let http_server = tokio::spawn(async move {
        let server = HttpServer::new(http_node);
        if let Err(e) = server.run(&rpc.http_addr).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tracing::info!("Ledger node running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!(
        "Shutting down with {} blocks and {} peers",
        node.chain_len(),
        node.session_count()
    );
    http_server.abort();

    Ok(())
}
