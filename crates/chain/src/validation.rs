//! Successor and whole-chain validation
//!
//! The `check_*` functions report which invariant failed; the `is_valid_*`
//! wrappers log that reason and collapse it to a bool.

use crate::block::{genesis, Block};
use crate::error::{BlockError, ChainError};

/// Check that `candidate` directly follows `previous`
pub fn check_successor(candidate: &Block, previous: &Block) -> Result<(), BlockError> {
    let expected = previous.index + 1;
    if candidate.index != expected {
        return Err(BlockError::IndexMismatch {
            expected,
            actual: candidate.index,
        });
    }

    if candidate.previous_hash != previous.hash {
        return Err(BlockError::PreviousHashMismatch {
            index: candidate.index,
        });
    }

    let computed = candidate.hash_contents();
    if computed != candidate.hash {
        return Err(BlockError::HashMismatch {
            index: candidate.index,
            computed,
            claimed: candidate.hash.clone(),
        });
    }

    Ok(())
}

pub fn is_valid_successor(candidate: &Block, previous: &Block) -> bool {
    match check_successor(candidate, previous) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Rejected block {}: {}", candidate.index, e);
            false
        }
    }
}

/// Check a full chain from genesis to tip
pub fn check_chain(chain: &[Block]) -> Result<(), ChainError> {
    let first = chain.first().ok_or(ChainError::Empty)?;
    if *first != genesis() {
        return Err(ChainError::GenesisMismatch);
    }

    for (position, pair) in chain.windows(2).enumerate() {
        check_successor(&pair[1], &pair[0]).map_err(|source| ChainError::InvalidBlock {
            position: position + 1,
            source,
        })?;
    }

    Ok(())
}

pub fn is_valid_chain(chain: &[Block]) -> bool {
    match check_chain(chain) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Rejected chain of {} blocks: {}", chain.len(), e);
            false
        }
    }
}
