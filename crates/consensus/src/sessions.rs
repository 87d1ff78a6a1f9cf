//! Active peer session set
//!
//! Each open session is represented by the sending half of its bounded
//! outbound queue; a writer task on the other end owns the websocket.
//! Enqueueing never waits, so the set can be driven under the node lock.

use crate::error::TransportError;
use crate::types::{PeerMessage, SessionState};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Session identifier, unique per node
pub type SessionId = u64;

/// One open connection to another node
#[derive(Debug)]
pub struct PeerSession {
    pub id: SessionId,
    /// Remote address as dialed or as accepted
    pub addr: String,
    pub state: SessionState,
    outbound: mpsc::Sender<String>,
}

impl PeerSession {
    fn enqueue(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .try_send(text)
            .map_err(|_| TransportError::Closed(self.id))
    }
}

/// Open sessions keyed by id
#[derive(Debug, Default)]
pub struct SessionSet {
    sessions: BTreeMap<SessionId, PeerSession>,
}

impl SessionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session as open
    pub fn open(&mut self, id: SessionId, addr: String, outbound: mpsc::Sender<String>) {
        tracing::info!("Peer session {} open ({})", id, addr);
        self.sessions.insert(
            id,
            PeerSession {
                id,
                addr,
                state: SessionState::Open,
                outbound,
            },
        );
    }

    /// Remove a session; dropping its queue sender stops its writer
    pub fn close(&mut self, id: SessionId) -> Option<PeerSession> {
        let mut session = self.sessions.remove(&id)?;
        session.state = SessionState::Closed;
        tracing::info!("Peer session {} closed ({})", id, session.addr);
        Some(session)
    }

    /// Send to one session, closing it if its queue is gone or full
    pub fn send(&mut self, id: SessionId, msg: &PeerMessage) -> Result<(), TransportError> {
        let session = self.sessions.get(&id).ok_or(TransportError::Closed(id))?;
        let result = session.enqueue(msg.to_text());
        if result.is_err() {
            tracing::warn!("Dropping peer session {}: outbound queue unavailable", id);
            self.close(id);
        }
        result
    }

    /// Send to every open session; returns how many accepted the message
    ///
    /// Sessions that fail are closed and pruned, the rest still receive it.
    pub fn broadcast(&mut self, msg: &PeerMessage) -> usize {
        let text = msg.to_text();
        let mut failed = Vec::new();
        let mut delivered = 0;

        for session in self.sessions.values() {
            match session.enqueue(text.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => failed.push(session.id),
            }
        }

        for id in failed {
            tracing::warn!("Dropping peer session {}: broadcast failed", id);
            self.close(id);
        }

        tracing::debug!("Broadcast {} to {} peers", msg.kind(), delivered);
        delivered
    }

    pub fn addrs(&self) -> Vec<String> {
        self.sessions.values().map(|s| s.addr.clone()).collect()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
