//! Replication and transport errors

use crate::sessions::SessionId;
use ledger_chain::BlockError;
use thiserror::Error;

/// A frame that could not be understood; always discarded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    /// The freshly built block no longer follows the local tip; retryable
    #[error("Append rejected: {0}")]
    AppendRejected(#[source] BlockError),
}

/// Failure on a single peer session; only that session is affected
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connect to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Session {0} is closed")]
    Closed(SessionId),
}
