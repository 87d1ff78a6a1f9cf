//! Block structure and hash codec

use crate::{GENESIS_DATA, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Ordered sequence of blocks, genesis first
pub type Chain = Vec<Block>;

/// A single ledger entry
///
/// Field names on the wire are camelCase so every node agrees on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain (0 for genesis)
    pub index: u64,
    /// Hex digest of the predecessor ("0" for genesis)
    pub previous_hash: String,
    /// Creation time (unix seconds), only used as hash input
    pub timestamp: i64,
    /// Opaque payload
    pub data: String,
    /// Hex digest of the four fields above
    pub hash: String,
}

impl Block {
    /// Build the successor of `previous` carrying `payload`, stamped now
    pub fn next(previous: &Block, payload: impl Into<String>) -> Self {
        Self::next_at(previous, payload, chrono::Utc::now().timestamp())
    }

    /// Build the successor of `previous` with an explicit timestamp
    pub fn next_at(previous: &Block, payload: impl Into<String>, timestamp: i64) -> Self {
        let index = previous.index + 1;
        let data = payload.into();
        let hash = compute_hash(index, &previous.hash, timestamp, &data);
        Self {
            index,
            previous_hash: previous.hash.clone(),
            timestamp,
            data,
            hash,
        }
    }

    /// Recompute the digest from this block's own fields
    pub fn hash_contents(&self) -> String {
        compute_hash(self.index, &self.previous_hash, self.timestamp, &self.data)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// Compute the hex SHA-512 digest of a block's contents
///
/// Integers go in as little-endian 8-byte words and strings are prefixed
/// with their byte length, so distinct field tuples never share an encoding.
pub fn compute_hash(index: u64, previous_hash: &str, timestamp: i64, data: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(index.to_le_bytes());
    update_str(&mut hasher, previous_hash);
    hasher.update(timestamp.to_le_bytes());
    update_str(&mut hasher, data);
    hex::encode(hasher.finalize())
}

fn update_str(hasher: &mut Sha512, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// The fixed first block every node starts from
pub fn genesis() -> Block {
    Block {
        index: 0,
        previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        timestamp: GENESIS_TIMESTAMP,
        data: GENESIS_DATA.to_string(),
        hash: compute_hash(0, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP, GENESIS_DATA),
    }
}
