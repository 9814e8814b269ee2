//! spent nullifier hashes
//!
//! a withdrawal reveals `H(nullifier, 0)`. if the hash is already in the
//! registry, the withdrawal is rejected. `Spent` is terminal from the
//! outside; only the pool may undo a mark it staged in the same call.

use std::collections::HashSet;

use crate::error::PoolError;
use crate::note::NullifierHash;

/// set of consumed nullifier hashes
#[derive(Clone, Debug, Default)]
pub struct NullifierRegistry {
    spent: HashSet<NullifierHash>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// check if the hash was already used for a withdrawal
    pub fn is_spent(&self, hash: &NullifierHash) -> bool {
        self.spent.contains(hash)
    }

    /// record a withdrawal; fails if the hash is already present
    pub fn mark_spent(&mut self, hash: NullifierHash) -> Result<(), PoolError> {
        if !self.spent.insert(hash) {
            return Err(PoolError::AlreadySpent);
        }
        Ok(())
    }

    /// revert a staged mark after the payout failed
    pub(crate) fn unmark(&mut self, hash: &NullifierHash) {
        self.spent.remove(hash);
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NullifierHash> {
        self.spent.iter()
    }
}
