//! Validation errors

use thiserror::Error;

/// Why a block cannot follow its predecessor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Invalid index: expected {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },

    #[error("Invalid previous hash at index {index}")]
    PreviousHashMismatch { index: u64 },

    #[error("Invalid hash at index {index}: computed {computed}, claimed {claimed}")]
    HashMismatch {
        index: u64,
        computed: String,
        claimed: String,
    },
}

/// Why a whole chain is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Chain is empty")]
    Empty,

    #[error("First block is not the genesis block")]
    GenesisMismatch,

    #[error("Invalid block at position {position}: {source}")]
    InvalidBlock {
        position: usize,
        #[source]
        source: BlockError,
    },
}
