//! Control methods - what each HTTP route does to the node

use ledger_chain::{Block, Chain};
use ledger_consensus::{Node, ReplicationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============ Request/Response Types ============

#[derive(Debug, Serialize, Deserialize)]
pub struct MineBlockRequest {
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddPeerRequest {
    pub peer: String,
}

// ============ Handlers ============

/// Handle GET /blocks
pub fn handle_list_chain(node: &Node) -> Chain {
    node.list_chain()
}

/// Handle POST /mineBlock
pub fn handle_mine_block(node: &Node, request: MineBlockRequest) -> Result<Block, RpcError> {
    let block = node.mine(request.data).map_err(|e| match e {
        ReplicationError::AppendRejected(reason) => RpcError::AppendRejected(reason.to_string()),
    })?;
    tracing::info!("Block added: {}", block.index);
    Ok(block)
}

/// Handle GET /peers
pub fn handle_list_peers(node: &Node) -> Vec<String> {
    node.list_peers()
}

/// Handle POST /addPeer
///
/// The dial runs in the background; its outcome only shows up in
/// `/peers` and in the log.
pub fn handle_add_peer(node: &Arc<Node>, request: AddPeerRequest) -> Result<(), RpcError> {
    let peer = request.peer.trim().to_string();
    if peer.is_empty() {
        return Err(RpcError::InvalidParams("Missing peer address".to_string()));
    }

    let node = node.clone();
    tokio::spawn(async move {
        let _ = node.add_peer(&peer).await;
    });
    Ok(())
}

// ============ Error Types ============

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Append rejected, retry: {0}")]
    AppendRejected(String),
}
