//! Ledger Chain - blocks, hashing and validation
//!
//! This crate holds the pure parts of the replicated ledger:
//! - Block structure and the SHA-512 hash binding a block to its predecessor
//! - The fixed genesis block shared by every node
//! - Successor and whole-chain validation

pub mod block;
pub mod error;
pub mod validation;

pub use block::{compute_hash, genesis, Block, Chain};
pub use error::{BlockError, ChainError};
pub use validation::{check_chain, check_successor, is_valid_chain, is_valid_successor};

/// Previous-hash marker carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Genesis creation time (unix seconds)
pub const GENESIS_TIMESTAMP: i64 = 1_682_839_690;

/// Genesis payload
pub const GENESIS_DATA: &str = "RUT-MIIT first block";
