//! Core types for peer messages and node configuration

use crate::error::ProtocolError;
use ledger_chain::Chain;
use serde::{Deserialize, Serialize};

/// Wire tag for a query for the peer's latest block
pub const QUERY_LATEST: u8 = 0;
/// Wire tag for a query for the peer's whole chain
pub const QUERY_ALL: u8 = 1;
/// Wire tag for a chain (or single latest block) response
pub const RESPONSE_CHAIN: u8 = 2;

/// JSON envelope exchanged over every peer session
///
/// `data` carries the chain as JSON text, not as a nested array.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

/// Message types for the peer network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    /// Ask for the latest block only
    QueryLatest,

    /// Ask for the full chain
    QueryAll,

    /// A candidate chain, possibly just the sender's latest block
    Chain(Chain),
}

impl PeerMessage {
    /// Encode as a text frame
    pub fn to_text(&self) -> String {
        let envelope = match self {
            PeerMessage::QueryLatest => Envelope {
                kind: QUERY_LATEST,
                data: None,
            },
            PeerMessage::QueryAll => Envelope {
                kind: QUERY_ALL,
                data: None,
            },
            PeerMessage::Chain(chain) => Envelope {
                kind: RESPONSE_CHAIN,
                data: Some(
                    serde_json::to_string(chain).expect("Chain serialization should not fail"),
                ),
            },
        };
        serde_json::to_string(&envelope).expect("PeerMessage serialization should not fail")
    }

    /// Decode a text frame
    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| ProtocolError::Malformed(format!("bad envelope: {}", e)))?;

        match envelope.kind {
            QUERY_LATEST => Ok(PeerMessage::QueryLatest),
            QUERY_ALL => Ok(PeerMessage::QueryAll),
            RESPONSE_CHAIN => {
                let data = envelope
                    .data
                    .ok_or_else(|| ProtocolError::Malformed("chain message without data".into()))?;
                let chain: Chain = serde_json::from_str(&data)
                    .map_err(|e| ProtocolError::Malformed(format!("bad chain data: {}", e)))?;
                Ok(PeerMessage::Chain(chain))
            }
            other => Err(ProtocolError::Malformed(format!("unknown message type {}", other))),
        }
    }

    /// Name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::QueryLatest => "QueryLatest",
            PeerMessage::QueryAll => "QueryAll",
            PeerMessage::Chain(_) => "Chain",
        }
    }
}

/// Lifecycle of a peer session
///
/// A session only exists once its websocket is up; the dial or handshake
/// before that is the pending `connect`/accept future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered in the active set
    Open,
    /// Terminal; removed from the active set
    Closed,
}

/// Configuration for a replicating node
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Address the peer-protocol listener binds
    pub p2p_addr: String,
    /// Upper bound on a single websocket send
    pub send_timeout_ms: u64,
    /// Upper bound on dialing a peer (TCP + websocket handshake)
    pub connect_timeout_ms: u64,
    /// Frames buffered per session before the session counts as stalled
    pub outbound_queue_len: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            p2p_addr: "0.0.0.0:6001".to_string(),
            send_timeout_ms: 5_000,
            connect_timeout_ms: 5_000,
            outbound_queue_len: 256,
        }
    }
}
