//! Ledger Consensus - longest-chain replication over websocket peers
//!
//! Architecture:
//! - One `Node` per process owns the chain and the open peer sessions
//! - Locally mined blocks are appended and broadcast to every peer
//! - Chains received from peers are adopted when longer and valid
//! - New sessions immediately ask the peer for its latest block

pub mod types;
pub mod error;
pub mod replication;
pub mod sessions;
pub mod node;
pub mod broadcast;

pub use types::*;
pub use error::{ProtocolError, ReplicationError, TransportError};
pub use replication::{Ledger, ReplicationOutcome};
pub use sessions::{PeerSession, SessionId, SessionSet};
pub use node::{Node, NodeBuilder};
pub use broadcast::{connect, PeerServer};
