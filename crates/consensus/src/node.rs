//! Node aggregate - the one chain and the session set behind one lock
//!
//! Every operation that touches the chain or the sessions takes `state`,
//! so appends, replacements, snapshots and broadcasts are serialized.

use crate::broadcast::{self, PeerServer};
use crate::error::{ProtocolError, ReplicationError, TransportError};
use crate::replication::{Ledger, ReplicationOutcome};
use crate::sessions::{SessionId, SessionSet};
use crate::types::{PeerMessage, ReplicationConfig};
use ledger_chain::{Block, Chain};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

struct NodeState {
    ledger: Ledger,
    sessions: SessionSet,
}

/// A replicating ledger node
pub struct Node {
    state: Mutex<NodeState>,
    next_session_id: AtomicU64,
    config: ReplicationConfig,
}

impl Node {
    /// Create a node holding the genesis-only chain
    pub fn new(config: ReplicationConfig) -> Self {
        Self {
            state: Mutex::new(NodeState {
                ledger: Ledger::new(),
                sessions: SessionSet::new(),
            }),
            next_session_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Bind the peer-protocol listener; returns the bound address
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<SocketAddr> {
        PeerServer::new(self.clone()).start(&self.config.p2p_addr).await
    }

    // ============ Façade contract ============

    /// Read-only copy of the chain
    pub fn list_chain(&self) -> Chain {
        self.state.lock().ledger.snapshot()
    }

    pub fn latest_block(&self) -> Block {
        self.state.lock().ledger.latest_block().clone()
    }

    pub fn chain_len(&self) -> usize {
        self.state.lock().ledger.len()
    }

    /// Append a block carrying `payload` and announce it to every peer
    pub fn mine(&self, payload: impl Into<String>) -> Result<Block, ReplicationError> {
        let mut state = self.state.lock();
        let block = state.ledger.append_local(payload)?;
        tracing::info!("Block {} mined: {}", block.index, block.hash);
        state
            .sessions
            .broadcast(&PeerMessage::Chain(vec![block.clone()]));
        Ok(block)
    }

    /// Send the latest block to every open session
    pub fn broadcast_latest(&self) -> usize {
        let mut state = self.state.lock();
        let msg = PeerMessage::Chain(vec![state.ledger.latest_block().clone()]);
        state.sessions.broadcast(&msg)
    }

    pub fn list_peers(&self) -> Vec<String> {
        self.state.lock().sessions.addrs()
    }

    /// Dial a peer; failures are logged and otherwise dropped
    pub async fn add_peer(self: &Arc<Self>, addr: &str) -> Result<SessionId, TransportError> {
        let result = broadcast::connect(self.clone(), addr).await;
        if let Err(e) = &result {
            tracing::warn!("Connection to peer {} failed: {}", addr, e);
        }
        result
    }

    // ============ Session plumbing ============

    /// Register an open session fed by `outbound` and ask the peer for its
    /// latest block
    pub fn open_session(&self, addr: String, outbound: mpsc::Sender<String>) -> SessionId {
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.sessions.open(id, addr, outbound);
        let _ = state.sessions.send(id, &PeerMessage::QueryLatest);
        id
    }

    pub fn close_session(&self, id: SessionId) {
        self.state.lock().sessions.close(id);
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Decode and dispatch a text frame; malformed frames are dropped
    pub fn handle_text(
        &self,
        id: SessionId,
        text: &str,
    ) -> Result<Option<ReplicationOutcome>, ProtocolError> {
        let msg = PeerMessage::from_text(text).map_err(|e| {
            tracing::debug!("Discarding frame from session {}: {}", id, e);
            e
        })?;
        Ok(self.handle_message(id, msg))
    }

    /// Dispatch a message received on session `id`
    ///
    /// Returns the replication outcome for `Chain` messages.
    pub fn handle_message(&self, id: SessionId, msg: PeerMessage) -> Option<ReplicationOutcome> {
        tracing::debug!("Received {} from session {}", msg.kind(), id);
        let mut state = self.state.lock();

        match msg {
            PeerMessage::QueryLatest => {
                let reply = PeerMessage::Chain(vec![state.ledger.latest_block().clone()]);
                let _ = state.sessions.send(id, &reply);
                None
            }
            PeerMessage::QueryAll => {
                let reply = PeerMessage::Chain(state.ledger.snapshot());
                let _ = state.sessions.send(id, &reply);
                None
            }
            PeerMessage::Chain(candidate) => {
                // A lone block from further ahead means we are missing history
                let lone_index = match candidate.as_slice() {
                    [block] => Some(block.index),
                    _ => None,
                };

                let outcome = state.ledger.receive_chain(candidate);
                if outcome.changed() {
                    let latest = PeerMessage::Chain(vec![state.ledger.latest_block().clone()]);
                    state.sessions.broadcast(&latest);
                } else if outcome == ReplicationOutcome::Rejected
                    && lone_index > Some(state.ledger.latest_block().index)
                {
                    tracing::info!("Session {} is ahead of us, querying full chain", id);
                    let _ = state.sessions.send(id, &PeerMessage::QueryAll);
                }
                Some(outcome)
            }
        }
    }
}

/// Builder for Node
pub struct NodeBuilder {
    config: ReplicationConfig,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self {
            config: ReplicationConfig::default(),
        }
    }

    pub fn p2p_addr(mut self, addr: &str) -> Self {
        self.config.p2p_addr = addr.to_string();
        self
    }

    pub fn send_timeout_ms(mut self, ms: u64) -> Self {
        self.config.send_timeout_ms = ms;
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Per-session queue capacity; at least one frame
    pub fn outbound_queue_len(mut self, len: usize) -> Self {
        self.config.outbound_queue_len = len.max(1);
        self
    }

    pub fn build(self) -> Node {
        Node::new(self.config)
    }
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_chain::{genesis, is_valid_chain};

    fn attach(node: &Node) -> (SessionId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        let id = node.open_session("127.0.0.1:1".to_string(), tx);
        (id, rx)
    }

    fn next_message(rx: &mut mpsc::Receiver<String>) -> PeerMessage {
        PeerMessage::from_text(&rx.try_recv().unwrap()).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<String>) {
        while rx.try_recv().is_ok() {}
    }

    #[test]
    fn test_open_session_queries_latest() {
        let node = NodeBuilder::new().build();
        let (_, mut rx) = attach(&node);
        assert_eq!(next_message(&mut rx), PeerMessage::QueryLatest);
        assert_eq!(node.session_count(), 1);
    }

    #[test]
    fn test_queries_are_answered() {
        let node = NodeBuilder::new().build();
        node.mine("a").unwrap();
        let (id, mut rx) = attach(&node);
        drain(&mut rx);

        assert_eq!(node.handle_message(id, PeerMessage::QueryLatest), None);
        assert_eq!(
            next_message(&mut rx),
            PeerMessage::Chain(vec![node.latest_block()])
        );

        node.handle_message(id, PeerMessage::QueryAll);
        assert_eq!(next_message(&mut rx), PeerMessage::Chain(node.list_chain()));
    }

    #[test]
    fn test_mine_broadcasts_latest() {
        let node = NodeBuilder::new().build();
        let (_, mut a) = attach(&node);
        let (_, mut b) = attach(&node);
        drain(&mut a);
        drain(&mut b);

        let block = node.mine("x").unwrap();
        for rx in [&mut a, &mut b] {
            assert_eq!(next_message(rx), PeerMessage::Chain(vec![block.clone()]));
        }
        assert_eq!(node.chain_len(), 2);
    }

    #[test]
    fn test_extension_is_rebroadcast() {
        let node = NodeBuilder::new().build();
        let (sender, mut from) = attach(&node);
        let (_, mut other) = attach(&node);
        drain(&mut from);
        drain(&mut other);

        let block = Block::next_at(&genesis(), "x", 1_700_000_000);
        let outcome = node.handle_message(sender, PeerMessage::Chain(vec![block.clone()]));

        assert_eq!(outcome, Some(ReplicationOutcome::ExtendedByOneBlock));
        assert_eq!(node.latest_block(), block);
        for rx in [&mut from, &mut other] {
            assert_eq!(next_message(rx), PeerMessage::Chain(vec![block.clone()]));
        }
    }

    #[test]
    fn test_lone_block_ahead_triggers_full_query() {
        let ahead = NodeBuilder::new().build();
        ahead.mine("1").unwrap();
        ahead.mine("2").unwrap();

        let node = NodeBuilder::new().build();
        let (id, mut rx) = attach(&node);
        drain(&mut rx);

        let outcome = node.handle_message(id, PeerMessage::Chain(vec![ahead.latest_block()]));
        assert_eq!(outcome, Some(ReplicationOutcome::Rejected));
        assert_eq!(next_message(&mut rx), PeerMessage::QueryAll);

        let outcome = node.handle_message(id, PeerMessage::Chain(ahead.list_chain()));
        assert_eq!(outcome, Some(ReplicationOutcome::Replaced));
        assert_eq!(node.chain_len(), 3);
        assert!(is_valid_chain(&node.list_chain()));
    }

    #[test]
    fn test_ignored_chain_is_not_broadcast() {
        let node = NodeBuilder::new().build();
        let (id, mut rx) = attach(&node);
        drain(&mut rx);

        let outcome = node.handle_message(id, PeerMessage::Chain(vec![genesis()]));
        assert_eq!(outcome, Some(ReplicationOutcome::Ignored));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_malformed_frame_keeps_session() {
        let node = NodeBuilder::new().build();
        let (id, _rx) = attach(&node);

        assert!(node.handle_text(id, r#"{"type":42}"#).is_err());
        assert!(node.handle_text(id, "garbage").is_err());
        assert_eq!(node.session_count(), 1);
        assert_eq!(node.handle_text(id, r#"{"type":0}"#).unwrap(), None);
    }

    #[test]
    fn test_outbound_queue_len_is_at_least_one() {
        let node = NodeBuilder::new().outbound_queue_len(0).build();
        assert_eq!(node.config().outbound_queue_len, 1);

        let node = NodeBuilder::new().outbound_queue_len(32).build();
        assert_eq!(node.config().outbound_queue_len, 32);
    }

    #[test]
    fn test_session_churn_during_broadcast() {
        let node = Arc::new(NodeBuilder::new().build());
        let mut sessions: Vec<_> = (0..8).map(|_| attach(&node)).collect();
        for (_, rx) in sessions.iter_mut() {
            drain(rx);
        }

        let closing: Vec<_> = sessions.drain(..3).collect();
        let closer = {
            let node = node.clone();
            std::thread::spawn(move || {
                for (id, rx) in closing {
                    node.close_session(id);
                    drop(rx);
                }
            })
        };
        let delivered = node.broadcast_latest();
        closer.join().unwrap();

        assert!((5..=8).contains(&delivered));
        assert_eq!(node.session_count(), 5);
        for (_, rx) in sessions.iter_mut() {
            assert_eq!(next_message(rx), PeerMessage::Chain(vec![genesis()]));
            assert!(rx.try_recv().is_err());
        }
        assert!(is_valid_chain(&node.list_chain()));
    }
}
