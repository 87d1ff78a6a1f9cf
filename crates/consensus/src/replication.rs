//! Replication engine - owns the chain and applies the longest-chain rule

use crate::error::ReplicationError;
use ledger_chain::{check_successor, genesis, is_valid_chain, is_valid_successor, Block, Chain};

/// Result of offering a candidate chain to the local ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationOutcome {
    /// Candidate is not longer than the local chain
    Ignored,
    /// Candidate's tip directly followed the local tip and was appended
    ExtendedByOneBlock,
    /// Local chain was swapped for the candidate
    Replaced,
    /// Candidate is longer but invalid or malformed
    Rejected,
}

impl ReplicationOutcome {
    /// Whether the local tip moved and peers should hear about it
    pub fn changed(self) -> bool {
        matches!(
            self,
            ReplicationOutcome::ExtendedByOneBlock | ReplicationOutcome::Replaced
        )
    }
}

/// The single authoritative chain of a node
///
/// Not synchronized on its own; `Node` keeps it behind its state lock.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Chain,
}

impl Ledger {
    /// Start from the genesis-only chain
    pub fn new() -> Self {
        Self {
            chain: vec![genesis()],
        }
    }

    pub fn latest_block(&self) -> &Block {
        // The chain always holds at least genesis
        &self.chain[self.chain.len() - 1]
    }

    pub fn snapshot(&self) -> Chain {
        self.chain.clone()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Build a block carrying `payload` on top of the tip and append it
    pub fn append_local(&mut self, payload: impl Into<String>) -> Result<Block, ReplicationError> {
        let block = Block::next(self.latest_block(), payload);
        self.append(block.clone())?;
        Ok(block)
    }

    /// Append an already built block if it follows the tip
    pub fn append(&mut self, block: Block) -> Result<(), ReplicationError> {
        check_successor(&block, self.latest_block()).map_err(ReplicationError::AppendRejected)?;
        self.chain.push(block);
        Ok(())
    }

    /// Offer a candidate chain received from a peer
    ///
    /// A candidate is measured by the larger of its block count and the
    /// height its tip claims (`index + 1`), so a one-block message carrying a
    /// peer's latest block competes with the whole chain it heads, and a
    /// longer but malformed chain is rejected rather than ignored.
    pub fn receive_chain(&mut self, mut candidate: Chain) -> ReplicationOutcome {
        let Some(tip) = candidate.last() else {
            tracing::debug!("Received empty chain");
            return ReplicationOutcome::Rejected;
        };

        let claimed_len = (candidate.len() as u64).max(tip.index.saturating_add(1));
        let local_len = self.chain.len() as u64;

        if claimed_len <= local_len {
            tracing::debug!(
                "Received chain of height {} is not longer than local {}",
                claimed_len,
                local_len
            );
            return ReplicationOutcome::Ignored;
        }

        if claimed_len == local_len + 1 && is_valid_successor(tip, self.latest_block()) {
            if let Some(tip) = candidate.pop() {
                tracing::info!("Appending block {} received from peer", tip.index);
                self.chain.push(tip);
            }
            return ReplicationOutcome::ExtendedByOneBlock;
        }

        if candidate.len() > self.chain.len() && is_valid_chain(&candidate) {
            tracing::info!(
                "Replacing local chain of {} blocks with received chain of {}",
                self.chain.len(),
                candidate.len()
            );
            self.chain = candidate;
            return ReplicationOutcome::Replaced;
        }

        tracing::debug!("Rejected received chain of height {}", claimed_len);
        ReplicationOutcome::Rejected
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
